use crate::domain::response::{DeleteResponse, PutResponse};
use crate::domain::{BulkResponse, CallOptions, FieldMap};
use crate::error::DirectoryError;
use async_trait::async_trait;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for the cache and the remote directory

/// Port for the key-value side cache.
/// `get` returns `Ok(None)` on a miss; `Err` is reserved for connectivity or backend failures.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, val: String, ttl: Option<TtlMs>) -> Result<PutResponse>;
    async fn delete(&self, keys: &[&str]) -> Result<DeleteResponse>;
    async fn close(&self) -> Result<()>;
}

/// Port for the remote customer directory's bulk API.
#[async_trait]
pub trait CustomerDirectory: Send + Sync + 'static {
    async fn get_customers_bulk(
        &self,
        filters: &[FieldMap],
        opts: &CallOptions,
    ) -> std::result::Result<BulkResponse, DirectoryError>;

    async fn save_customer_bulk(
        &self,
        items: &[FieldMap],
        opts: &CallOptions,
    ) -> std::result::Result<BulkResponse, DirectoryError>;

    async fn delete_customer_bulk(
        &self,
        items: &[FieldMap],
        opts: &CallOptions,
    ) -> std::result::Result<BulkResponse, DirectoryError>;
}
