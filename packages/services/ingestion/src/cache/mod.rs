//! Cache port shared by the ingestor (invalidation) and the read API (cache-aside).

mod memory;

pub use memory::MemoryCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Result, DEFAULT_REVIEW_LIMIT, DEFAULT_REVIEW_SORT};

/// Review listing variants evicted whenever a hotel's reviews change.
pub const INVALIDATED_REVIEW_LIMITS: [usize; 3] = [DEFAULT_REVIEW_LIMIT, 100, 200];

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

pub fn hotel_key(id: i64, lang: &str) -> String {
    format!("hotel:{}:{}", id, lang.to_lowercase())
}

pub fn reviews_key(id: i64, limit: usize, sort: &str) -> String {
    format!("reviews:{}:{}:{}", id, limit, sort)
}

/// Every review listing key the ingestor evicts for `id`.
pub fn review_listing_keys(id: i64) -> Vec<String> {
    INVALIDATED_REVIEW_LIMITS
        .iter()
        .map(|limit| reviews_key(id, *limit, DEFAULT_REVIEW_SORT))
        .collect()
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl).await
}
