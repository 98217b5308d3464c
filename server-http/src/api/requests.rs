use crm::Customer;
use serde::Deserialize;
use serde_json::Value;

/// Query string for `GET /api/customers`. Values are validated in [`crate::validation`].
#[derive(Debug, Default, Deserialize)]
pub struct ListCustomersQuery {
    #[serde(rename = "pageNo")]
    pub page_no: Option<String>,
    #[serde(rename = "recordsOnPage")]
    pub records_on_page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveCustomersRequest {
    #[serde(default)]
    pub customers: Vec<Customer>,
}

/// IDs may be JSON numbers or strings; anything else is rejected per item.
#[derive(Debug, Deserialize)]
pub struct DeleteCustomersRequest {
    #[serde(rename = "customerIDs", default)]
    pub customer_ids: Vec<Value>,
}
