use crate::domain::BulkResponse;
use std::time::Duration;
use thiserror::Error;

/// Remote code for "invalid classifier ID, there is no such item".
pub const ALREADY_DELETED_CODE: i64 = 1011;

/// Failure reported by a customer directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("remote API error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        field: Option<String>,
        response: Option<Box<BulkResponse>>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl DirectoryError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        DirectoryError::Api {
            code,
            message: message.into(),
            field: None,
            response: None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            DirectoryError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the remote refused because the item no longer exists.
    pub fn is_already_deleted(&self) -> bool {
        match self {
            DirectoryError::Api { code, message, .. } => {
                *code == ALREADY_DELETED_CODE || mentions_code(message, ALREADY_DELETED_CODE)
            }
            _ => false,
        }
    }

    /// Partial bulk response attached to the error, if the remote sent one.
    pub fn into_response(self) -> Option<BulkResponse> {
        match self {
            DirectoryError::Api { response, .. } => response.map(|r| *r),
            _ => None,
        }
    }
}

/// Whether `code` appears in `message` as a whole number, not as part of a longer one.
fn mentions_code(message: &str, code: i64) -> bool {
    let code = code.to_string();
    message
        .split(|c: char| !c.is_ascii_digit())
        .any(|token| token == code)
}

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("{0}")]
    EmptyBatch(&'static str),

    #[error("invalid customer ID type")]
    InvalidCustomerId { value: String },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CustomerError {
    /// Rejected before any remote call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CustomerError::EmptyBatch(_) | CustomerError::InvalidCustomerId { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_deleted_classification() {
        assert!(DirectoryError::api(1011, "Invalid classifier ID").is_already_deleted());
        assert!(!DirectoryError::api(1002, "Too many requests").is_already_deleted());
        assert!(!DirectoryError::Transport("connection reset".into()).is_already_deleted());
        assert!(DirectoryError::api(1000, "bulk failed: error 1011").is_already_deleted());
    }

    #[test]
    fn test_longer_codes_are_not_already_deleted() {
        assert!(!DirectoryError::api(10110, "Erply error 10110").is_already_deleted());
        assert!(!DirectoryError::api(21011, "Erply error 21011").is_already_deleted());
        assert!(!DirectoryError::api(1002, "see item 110112").is_already_deleted());
        assert!(DirectoryError::api(1000, "item 3 failed (1011)").is_already_deleted());
    }

    #[test]
    fn test_into_response() {
        let response = BulkResponse::default();
        let err = DirectoryError::Api {
            code: 1011,
            message: "gone".into(),
            field: Some("customerID".into()),
            response: Some(Box::new(response.clone())),
        };
        assert_eq!(err.into_response(), Some(response));
        assert_eq!(DirectoryError::Decode("eof".into()).into_response(), None);
    }

    #[test]
    fn test_precondition_errors() {
        assert!(CustomerError::EmptyBatch("no customers to save").is_precondition());
        assert!(CustomerError::InvalidCustomerId { value: "true".into() }.is_precondition());
        assert!(!CustomerError::from(DirectoryError::api(1000, "down")).is_precondition());
        assert_eq!(
            CustomerError::EmptyBatch("no customer IDs provided").to_string(),
            "no customer IDs provided"
        );
    }
}
