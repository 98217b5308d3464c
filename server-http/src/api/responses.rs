use crm::BulkResponse;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_GOOD: &str = "good";
pub const STATUS_OK: &str = "ok";
pub const ALREADY_DELETED_MESSAGE: &str = "Some customers were already deleted.";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `customers` holds the serialized bulk response as a JSON string, byte-identical
/// whether it came from the cache or the remote.
#[derive(Serialize)]
pub struct ListCustomersResponse {
    pub customers: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteCustomersResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub response: BulkResponse,
}

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "customerIDs", skip_serializing_if = "Option::is_none")]
    pub customer_ids: Option<Vec<Value>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            customer_ids: None,
        }
    }

    pub fn with_customer_ids(mut self, ids: Vec<Value>) -> Self {
        self.customer_ids = Some(ids);
        self
    }
}
