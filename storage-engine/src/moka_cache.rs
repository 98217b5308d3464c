use async_trait::async_trait;
use crm::domain::response::{DeleteResponse, PutResponse};
use crm::ports::CacheStore;
use moka::future::Cache;
use moka::Expiry;
use shared::{Result, TtlMs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// Per-entry expiry: the TTL given on `put`, else the cache default.
struct EntryExpiry {
    default_ttl: Option<Duration>,
}

impl EntryExpiry {
    fn ttl_for(&self, entry: &Entry) -> Option<Duration> {
        entry.ttl.or(self.default_ttl)
    }
}

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        self.ttl_for(value)
    }

    // Overwrites restart the clock
    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.ttl_for(value)
    }
}

/// Moka-based cache implementation with per-entry TTL support
/// Provides lock-free, concurrent cache with optional size bounds
pub struct MokaCache {
    cache: Cache<String, Entry>,
}

impl MokaCache {
    pub fn new(name: String, max_entries: Option<u64>, default_ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .name(&name)
            .expire_after(EntryExpiry { default_ttl });

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Expired entries read as absent even before eviction runs
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, val: String, ttl: Option<TtlMs>) -> Result<PutResponse> {
        let existed = self.cache.contains_key(key);
        let entry = Entry {
            value: val,
            ttl: ttl.map(|t| t.as_duration()),
        };

        self.cache.insert(key.to_string(), entry).await;
        if existed {
            Ok(PutResponse::new(false, "Successfully updated"))
        } else {
            Ok(PutResponse::new(true, "Successfully inserted"))
        }
    }

    async fn delete(&self, keys: &[&str]) -> Result<DeleteResponse> {
        let mut deleted = 0;
        for key in keys {
            if self.cache.remove(*key).await.is_some() {
                deleted += 1;
            }
        }
        Ok(DeleteResponse::new(deleted))
    }

    async fn close(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

impl Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_moka_cache_put_and_get() {
        let cache = MokaCache::new("test".to_string(), None, None);

        let put_response = cache.put("hello", "world".to_string(), None).await.unwrap();
        assert!(put_response.created);
        assert_eq!(put_response.message, "Successfully inserted");

        let value = cache.get("hello").await.unwrap();
        assert_eq!(value.as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn test_moka_cache_get_nonexistent_is_a_miss() {
        let cache = MokaCache::new("test".to_string(), None, None);

        let value = cache.get("nonexistent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_delete() {
        let cache = MokaCache::new("test".to_string(), None, None);

        cache.put("test_key", "test_value".to_string(), None).await.unwrap();

        let delete_response = cache.delete(&["test_key"]).await.unwrap();
        assert_eq!(delete_response.deleted, 1);

        assert!(cache.get("test_key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_delete_many_counts_existing_only() {
        let cache = MokaCache::new("test".to_string(), None, None);

        cache.put("a", "1".to_string(), None).await.unwrap();
        cache.put("b", "2".to_string(), None).await.unwrap();

        let delete_response = cache.delete(&["a", "b", "missing"]).await.unwrap();
        assert_eq!(delete_response.deleted, 2);
    }

    #[tokio::test]
    async fn test_moka_cache_overwrite() {
        let cache = MokaCache::new("test".to_string(), None, None);

        cache.put("key", "value1".to_string(), None).await.unwrap();
        let put_response = cache.put("key", "value2".to_string(), None).await.unwrap();
        assert!(!put_response.created);

        assert_eq!(cache.get("key").await.unwrap().as_deref(), Some("value2"));
    }

    #[tokio::test]
    async fn test_moka_cache_with_per_entry_ttl() {
        let cache = MokaCache::new("test".to_string(), None, None);

        cache
            .put("ttl_key", "ttl_value".to_string(), Some(TtlMs(100)))
            .await
            .unwrap();
        cache.put("forever", "value".to_string(), None).await.unwrap();

        assert!(cache.get("ttl_key").await.unwrap().is_some());

        sleep(Duration::from_millis(200)).await;

        assert!(cache.get("ttl_key").await.unwrap().is_none());
        assert!(cache.get("forever").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_moka_cache_with_global_ttl() {
        let cache = MokaCache::new("test".to_string(), None, Some(Duration::from_millis(100)));

        cache
            .put("global_ttl_key", "global_ttl_value".to_string(), None)
            .await
            .unwrap();
        assert!(cache.get("global_ttl_key").await.unwrap().is_some());

        sleep(Duration::from_millis(200)).await;

        assert!(cache.get("global_ttl_key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_per_entry_ttl_overrides_default() {
        let cache = MokaCache::new("test".to_string(), None, Some(Duration::from_millis(100)));

        cache
            .put("long", "value".to_string(), Some(TtlMs(60_000)))
            .await
            .unwrap();

        sleep(Duration::from_millis(200)).await;

        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_moka_cache_bounded() {
        let cache = MokaCache::new("bounded".to_string(), Some(2), None);

        cache.put("key1", "value1".to_string(), None).await.unwrap();
        cache.put("key2", "value2".to_string(), None).await.unwrap();
        cache.put("key3", "value3".to_string(), None).await.unwrap();

        cache.cache.run_pending_tasks().await;

        assert!(cache.entry_count() <= 2, "Cache should have at most 2 entries");
    }

    #[tokio::test]
    async fn test_moka_cache_close_drops_entries() {
        let cache = MokaCache::new("close".to_string(), None, None);

        cache.put("key", "value".to_string(), None).await.unwrap();
        cache.close().await.unwrap();

        assert!(cache.get("key").await.unwrap().is_none());
    }
}
