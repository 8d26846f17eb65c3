use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clients::CupidConfig;
use crate::models::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub redis_url: String,
    pub cupid_base_url: String,
    pub cupid_api_key: String,
    pub cupid_requests_per_second: u32,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    pub ingest_workers: usize,
    pub ingest_review_count: usize,
    /// Raw `PROPERTY_IDS` list; see [`parse_property_ids`].
    pub property_ids: Option<String>,
    pub cache_ttl_seconds: u64,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());

        let mongodb_uri = get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let database_name = get("DATABASE_NAME").unwrap_or_else(|| "hotel_content".to_string());
        let redis_url = get("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string());
        let cupid_base_url = get("CUPID_BASE_URL").unwrap_or_else(|| "https://content-api.cupid.travel/v3.0".to_string());
        let cupid_api_key = get("CUPID_API_KEY").unwrap_or_default();
        let cupid_requests_per_second: u32 = get("CUPID_REQUESTS_PER_SECOND").and_then(|s| s.parse().ok()).unwrap_or(5);
        let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(15_000);
        let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "hotel-ingestor/0.1".to_string());
        let ingest_workers: usize = get("INGEST_WORKERS").and_then(|s| s.parse().ok()).unwrap_or(8);
        let ingest_review_count: usize = get("INGEST_REVIEW_COUNT").and_then(|s| s.parse().ok()).unwrap_or(100);
        let cache_ttl_seconds: u64 = get("CACHE_TTL_SECONDS").and_then(|s| s.parse().ok()).unwrap_or(900);
        let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8080);
        let log_format = get("LOG_FORMAT").unwrap_or_else(|| "json".to_string());

        let property_ids = get("PROPERTY_IDS");

        Self {
            port,
            mongodb_uri,
            database_name,
            redis_url,
            cupid_base_url,
            cupid_api_key,
            cupid_requests_per_second,
            http_timeout_ms,
            http_user_agent,
            ingest_workers,
            ingest_review_count,
            property_ids,
            cache_ttl_seconds,
            log_format,
        }
    }

    /// Checks needed before the ingestor talks to the content API.
    pub fn validate_for_ingestion(&self) -> Result<()> {
        if self.cupid_api_key.trim().is_empty() {
            return Err(IngestionError::Configuration("CUPID_API_KEY is required".to_string()));
        }
        if self.ingest_workers == 0 {
            return Err(IngestionError::Configuration("INGEST_WORKERS must be at least 1".to_string()));
        }
        if self.ingest_review_count == 0 {
            return Err(IngestionError::Configuration("INGEST_REVIEW_COUNT must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn cupid_config(&self) -> CupidConfig {
        CupidConfig {
            base_url: self.cupid_base_url.clone(),
            api_key: self.cupid_api_key.clone(),
            requests_per_second: self.cupid_requests_per_second,
            timeout: Duration::from_millis(self.http_timeout_ms),
            user_agent: self.http_user_agent.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Hotel ids separated by commas, whitespace or newlines. Lines starting with `#` are ignored.
pub fn parse_property_ids(raw: &str) -> Result<Vec<i64>> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| IngestionError::Configuration(format!("invalid property id: {:?}", s)))
        })
        .collect()
}
