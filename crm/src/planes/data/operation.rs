use crate::domain::{BulkResponse, Customer, CustomerId, Pagination};
use crate::error::CustomerError;
use async_trait::async_trait;
use serde_json::value::RawValue;

/// Where a listed page came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSource {
    Cache,
    Remote,
}

/// A page of customers as the serialized bulk response, replayed verbatim on cache hits.
#[derive(Debug)]
pub struct CustomerPage {
    pub payload: Box<RawValue>,
    pub source: PageSource,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeleteOutcome {
    Deleted(BulkResponse),
    /// Some targets were already gone; reported as success with a warning.
    AlreadyDeleted(BulkResponse),
}

impl DeleteOutcome {
    pub fn response(&self) -> &BulkResponse {
        match self {
            DeleteOutcome::Deleted(r) | DeleteOutcome::AlreadyDeleted(r) => r,
        }
    }
}

/// Application-level customer operations
#[async_trait]
pub trait CustomerOperations: Send + Sync + 'static {
    async fn list_customers(&self, pagination: Pagination) -> Result<CustomerPage, CustomerError>;

    async fn save_customers(&self, customers: Vec<Customer>) -> Result<BulkResponse, CustomerError>;

    async fn delete_customers(&self, ids: Vec<CustomerId>) -> Result<DeleteOutcome, CustomerError>;
}
