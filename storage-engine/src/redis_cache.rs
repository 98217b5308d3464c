use async_trait::async_trait;
use crm::domain::response::{DeleteResponse, PutResponse};
use crm::ports::CacheStore;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use shared::{Error, Result, TtlMs};
use std::fmt::Debug;

/// Redis-backed cache shared by every gateway instance.
pub struct RedisCache {
    pool: Pool,
}

fn unavailable(err: impl std::fmt::Display) -> Error {
    Error::Unavailable(err.to_string())
}

impl RedisCache {
    /// Accepts either `host:port` or a full `redis://` / `rediss://` URL.
    pub fn url_for(addr: &str) -> String {
        if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        }
    }

    /// Builds the pool and pings the server once.
    pub async fn connect(addr: &str) -> Result<Self> {
        let pool = Config::from_url(Self::url_for(addr))
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Internal(e.to_string()))?;

        let cache = Self { pool };
        cache.ping().await?;
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool.get().await.map_err(unavailable)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key).await.map_err(unavailable)
    }

    async fn put(&self, key: &str, val: String, ttl: Option<TtlMs>) -> Result<PutResponse> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(TtlMs(ms)) if ms > 0 => conn
                .pset_ex::<_, _, ()>(key, val, ms)
                .await
                .map_err(unavailable)?,
            _ => conn.set::<_, _, ()>(key, val).await.map_err(unavailable)?,
        }
        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn delete(&self, keys: &[&str]) -> Result<DeleteResponse> {
        if keys.is_empty() {
            return Ok(DeleteResponse::new(0));
        }
        let mut conn = self.connection().await?;
        let deleted = conn
            .del::<_, u64>(keys.to_vec())
            .await
            .map_err(unavailable)?;
        Ok(DeleteResponse::new(deleted))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close();
        Ok(())
    }
}

impl Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisCache")
            .field("pool_size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}
