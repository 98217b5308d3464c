use crm::planes::data::CustomerOperations;
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub customer_operations: Arc<dyn CustomerOperations>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(customer_operations: Arc<dyn CustomerOperations>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            customer_operations,
            api_key: api_key.into(),
        }
    }
}
