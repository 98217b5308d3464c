pub mod moka_cache;
pub mod redis_cache;

pub use moka_cache::MokaCache;
pub use redis_cache::RedisCache;

use crm::ports::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Chooses the cache backend for the process.
pub struct CacheStoreFactory;

impl CacheStoreFactory {
    /// Process-local entries are capped; the listing cache only ever holds a handful of keys.
    const LOCAL_MAX_ENTRIES: u64 = 1_024;

    /// Redis when an address is configured, otherwise an in-process Moka cache.
    pub async fn create(
        redis_addr: Option<&str>,
        default_ttl: Duration,
    ) -> shared::Result<Arc<dyn CacheStore>> {
        match redis_addr {
            Some(addr) => {
                let cache = RedisCache::connect(addr).await?;
                info!("Connected to Redis at {}", addr);
                Ok(Arc::new(cache))
            }
            None => {
                info!("Using in-process Moka cache");
                Ok(Arc::new(MokaCache::new(
                    "customers".to_string(),
                    Some(Self::LOCAL_MAX_ENTRIES),
                    Some(default_ttl),
                )))
            }
        }
    }
}
