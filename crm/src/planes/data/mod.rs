pub mod customer_operations;
pub mod operation;

pub use customer_operations::{CustomerOperationsService, ServiceSettings, CUSTOMER_LIST_KEY};
pub use operation::{CustomerOperations, CustomerPage, DeleteOutcome, PageSource};
