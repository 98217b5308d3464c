//! Customer domain, ports and the read-through customer service.

pub mod domain;
pub mod error;
pub mod planes;
pub mod ports;

pub use domain::{
    BulkItemResult, BulkResponse, BulkStatus, CallOptions, Customer, CustomerId, FieldMap,
    ItemStatus, Pagination,
};
pub use error::{CustomerError, DirectoryError};
pub use planes::data::{
    CustomerOperations, CustomerOperationsService, CustomerPage, DeleteOutcome, PageSource,
    ServiceSettings,
};
pub use ports::{CacheStore, CustomerDirectory};
