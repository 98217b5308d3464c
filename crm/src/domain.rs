use crate::error::CustomerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// One item of a bulk request: field name to value, in insertion order.
pub type FieldMap = serde_json::Map<String, Value>;

/// Call-level options passed alongside a bulk request.
pub type CallOptions = BTreeMap<String, String>;

/// Field names understood by the remote directory.
pub mod fields {
    pub const CUSTOMER_ID: &str = "customerID";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const COMPANY_NAME: &str = "companyName";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const PAGE_NO: &str = "pageNo";
    pub const RECORDS_ON_PAGE: &str = "recordsOnPage";
}

pub mod response {
    #[derive(Clone, Debug)]
    pub struct PutResponse {
        pub created: bool,
        pub message: String,
    }

    impl PutResponse {
        pub fn new(created: bool, message: impl Into<String>) -> Self {
            Self {
                created,
                message: message.into(),
            }
        }
    }

    #[derive(Clone, Debug)]
    pub struct DeleteResponse {
        /// Number of keys that existed and were removed
        pub deleted: u64,
    }

    impl DeleteResponse {
        pub fn new(deleted: u64) -> Self {
            Self { deleted }
        }
    }
}

/// Page selection for a customer listing. Both values are positive by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub page_no: NonZeroU32,
    pub records_on_page: NonZeroU32,
}

impl Pagination {
    pub const DEFAULT_PAGE_NO: NonZeroU32 = NonZeroU32::MIN;
    pub const DEFAULT_RECORDS_ON_PAGE: NonZeroU32 = match NonZeroU32::new(100) {
        Some(n) => n,
        None => unreachable!(),
    };

    pub fn new(page_no: NonZeroU32, records_on_page: NonZeroU32) -> Self {
        Self {
            page_no,
            records_on_page,
        }
    }

    /// Filter map for the bulk list call. The remote expects string values.
    pub fn to_filter(&self) -> FieldMap {
        let mut filter = FieldMap::new();
        filter.insert(
            fields::RECORDS_ON_PAGE.to_string(),
            Value::String(self.records_on_page.to_string()),
        );
        filter.insert(
            fields::PAGE_NO.to_string(),
            Value::String(self.page_no.to_string()),
        );
        filter
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_NO, Self::DEFAULT_RECORDS_ON_PAGE)
    }
}

/// A customer to create or update. Unset fields are left out of the outbound payload;
/// `Some("")` is sent as-is and clears the field remotely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "customerID", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Customer {
    /// Sparse field mapping holding only the fields that are set.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        if let Some(id) = self.customer_id {
            map.insert(fields::CUSTOMER_ID.to_string(), Value::from(id));
        }

        let text_fields = [
            (fields::FIRST_NAME, &self.first_name),
            (fields::LAST_NAME, &self.last_name),
            (fields::COMPANY_NAME, &self.company_name),
            (fields::EMAIL, &self.email),
            (fields::PHONE, &self.phone),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                map.insert(name.to_string(), Value::String(value.clone()));
            }
        }
        map
    }
}

/// Customer identifier in the string form the remote delete call requires.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::CUSTOMER_ID.to_string(), Value::String(self.0.clone()));
        map
    }

    /// Normalizes a batch of raw JSON identifiers, failing on the first bad one.
    pub fn parse_all(values: &[Value]) -> Result<Vec<Self>, CustomerError> {
        values.iter().map(Self::try_from).collect()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CustomerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<&str> for CustomerId {
    type Error = CustomerError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CustomerError::InvalidCustomerId {
                value: raw.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<&Value> for CustomerId {
    type Error = CustomerError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let invalid = || CustomerError::InvalidCustomerId {
            value: value.to_string(),
        };
        match value {
            Value::String(s) => Self::try_from(s.as_str()),
            Value::Number(n) => {
                if let Some(id) = n.as_u64() {
                    return Ok(Self::from(id));
                }
                // 13380.0 arrives as a float from some clients
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                        Ok(Self::from(f as u64))
                    }
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

pub const RESPONSE_STATUS_OK: &str = "ok";
pub const RESPONSE_STATUS_ERROR: &str = "error";

/// Envelope-level status of a bulk call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatus {
    #[serde(default)]
    pub response_status: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_field: Option<String>,
    #[serde(flatten)]
    pub extra: FieldMap,
}

/// Status of a single item inside a bulk response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_name: Option<String>,
    #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub response_status: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_field: Option<String>,
    #[serde(flatten)]
    pub extra: FieldMap,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Value>>,
}

impl BulkItemResult {
    pub fn is_ok(&self) -> bool {
        self.status.error_code == 0 && self.status.response_status != RESPONSE_STATUS_ERROR
    }
}

/// Response of a bulk call: one envelope status plus ordered per-item results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub status: BulkStatus,
    #[serde(default)]
    pub requests: Vec<BulkItemResult>,
}

impl BulkResponse {
    pub fn is_ok(&self) -> bool {
        self.status.response_status == RESPONSE_STATUS_OK && self.status.error_code == 0
    }

    /// Items that failed, with their position in the request.
    pub fn failed_items(&self) -> impl Iterator<Item = (usize, &BulkItemResult)> {
        self.requests
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparse_field_map() {
        let customer = Customer {
            first_name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            ..Default::default()
        };

        let map = customer.to_field_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["firstName"], "Ada");
        assert_eq!(map["email"], "ada@example.com");
    }

    #[test]
    fn test_explicit_empty_field_is_sent() {
        let customer = Customer {
            customer_id: Some(42),
            phone: Some(String::new()),
            ..Default::default()
        };

        let map = customer.to_field_map();
        assert_eq!(Value::Object(map), json!({"customerID": 42, "phone": ""}));
    }

    #[test]
    fn test_customer_deserializes_camel_case() {
        let customer: Customer = serde_json::from_value(json!({
            "customerID": 7,
            "firstName": "Grace",
            "companyName": "Navy"
        }))
        .unwrap();

        assert_eq!(customer.customer_id, Some(7));
        assert_eq!(customer.first_name.as_deref(), Some("Grace"));
        assert_eq!(customer.company_name.as_deref(), Some("Navy"));
        assert!(customer.last_name.is_none());
    }

    #[test]
    fn test_customer_id_normalization() {
        let ids = CustomerId::parse_all(&[json!(13380), json!("13381"), json!(13382.0)]).unwrap();
        let as_strings: Vec<&str> = ids.iter().map(CustomerId::as_str).collect();
        assert_eq!(as_strings, vec!["13380", "13381", "13382"]);
    }

    #[test]
    fn test_customer_id_rejects_wrong_types() {
        for bad in [json!(true), json!(null), json!([1]), json!({"id": 1}), json!(-5), json!(1.5), json!("  ")] {
            let result = CustomerId::try_from(&bad);
            assert!(
                matches!(result, Err(CustomerError::InvalidCustomerId { .. })),
                "expected {bad} to be rejected"
            );
        }
    }

    #[test]
    fn test_pagination_filter() {
        let filter = Pagination::default().to_filter();
        assert_eq!(
            Value::Object(filter),
            json!({"recordsOnPage": "100", "pageNo": "1"})
        );
    }

    #[test]
    fn test_bulk_response_keeps_unknown_fields_and_finds_failures() {
        let raw = json!({
            "status": {
                "request": null,
                "requestUnixTime": 1700000000,
                "responseStatus": "ok",
                "errorCode": 0,
                "recordsTotal": 2
            },
            "requests": [
                {"status": {"requestName": "deleteCustomer", "requestID": 0, "responseStatus": "ok", "errorCode": 0}, "records": null},
                {"status": {"requestName": "deleteCustomer", "requestID": 1, "responseStatus": "error", "errorCode": 1011, "errorField": "customerID"}}
            ]
        });

        let response: BulkResponse = serde_json::from_value(raw).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.status.extra["recordsTotal"], 2);

        let failed: Vec<usize> = response.failed_items().map(|(i, _)| i).collect();
        assert_eq!(failed, vec![1]);
        assert_eq!(response.requests[1].status.error_field.as_deref(), Some("customerID"));
    }
}
