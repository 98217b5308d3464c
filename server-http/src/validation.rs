use crate::api::requests::ListCustomersQuery;
use crm::Pagination;
use std::num::NonZeroU32;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    NotPositiveInteger { field: &'static str, value: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotPositiveInteger { field, value } => {
                write!(f, "{} must be a positive integer, got '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Absent or blank values fall back to page 1 with 100 records.
pub fn validate_pagination(query: &ListCustomersQuery) -> Result<Pagination, ValidationError> {
    let page_no = positive_or_default(
        "pageNo",
        query.page_no.as_deref(),
        Pagination::DEFAULT_PAGE_NO,
    )?;
    let records_on_page = positive_or_default(
        "recordsOnPage",
        query.records_on_page.as_deref(),
        Pagination::DEFAULT_RECORDS_ON_PAGE,
    )?;
    Ok(Pagination::new(page_no, records_on_page))
}

fn positive_or_default(
    field: &'static str,
    raw: Option<&str>,
    default: NonZeroU32,
) -> Result<NonZeroU32, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<NonZeroU32>()
            .map_err(|_| ValidationError::NotPositiveInteger {
                field,
                value: value.to_string(),
            }),
    }
}
