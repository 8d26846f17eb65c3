use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::cache::Cache;
use crate::models::*;

/// Redis-backed cache. The connection manager reconnects on its own, so clones share one link.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| IngestionError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        // EX rejects 0
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        tracing::debug!(key = key, ttl_secs = seconds, "cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        tracing::debug!(key = key, removed = removed, "cache delete");
        Ok(())
    }
}
