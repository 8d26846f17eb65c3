use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::rate_limit::RateLimiter;
use super::retry::{is_retryable_status, sleep_cancellable, RetryPolicy};
use crate::models::*;

/// Longest error body kept on `UpstreamStatus`.
const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Envelope keys that may carry a review array.
const REVIEW_ENVELOPE_KEYS: [&str; 4] = ["reviews", "data", "items", "results"];

/// Source of raw hotel content. Implemented by [`CupidClient`]; tests substitute their own.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get_property(&self, id: i64, cancel: &CancellationToken) -> Result<JsonObject>;

    async fn get_translation(&self, id: i64, lang: &str, cancel: &CancellationToken) -> Result<JsonObject>;

    async fn get_reviews(&self, id: i64, count: usize, cancel: &CancellationToken) -> Result<Vec<JsonObject>>;
}

#[derive(Debug, Clone)]
pub struct CupidConfig {
    pub base_url: String,
    pub api_key: String,
    pub requests_per_second: u32,
    pub timeout: Duration,
    pub user_agent: String,
}

pub struct CupidClient {
    http: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl CupidClient {
    pub fn new(cfg: CupidConfig) -> Result<Self> {
        if cfg.api_key.trim().is_empty() {
            return Err(IngestionError::Configuration("CUPID_API_KEY is empty".to_string()));
        }
        if cfg.base_url.trim().is_empty() {
            return Err(IngestionError::Configuration("CUPID_BASE_URL is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(cfg.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| IngestionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key,
            user_agent: cfg.user_agent,
            limiter: Arc::new(RateLimiter::new(cfg.requests_per_second)),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn property_urls(&self, id: i64) -> Vec<String> {
        let base = &self.base_url;
        vec![format!("{base}/properties/{id}"), format!("{base}/property/{id}")]
    }

    pub fn translation_urls(&self, id: i64, lang: &str) -> Vec<String> {
        let base = &self.base_url;
        vec![
            format!("{base}/properties/{id}/translations/{lang}"),
            format!("{base}/properties/{id}/translation/{lang}"),
            format!("{base}/properties/{id}/lang/{lang}"),
            format!("{base}/property/{id}/lang/{lang}"),
        ]
    }

    pub fn review_urls(&self, id: i64, count: usize) -> Vec<String> {
        let base = &self.base_url;
        vec![
            format!("{base}/properties/{id}/reviews?limit={count}"),
            format!("{base}/properties/{id}/reviews/{count}"),
            format!("{base}/property/reviews/{id}/{count}"),
        ]
    }

    /// Try `candidates` in order. A 404 moves on to the next URL; any other error stops the walk.
    /// A 204 yields `Value::Null`.
    pub async fn get_first(&self, candidates: &[String], cancel: &CancellationToken) -> Result<Value> {
        let mut last_err = None;
        for url in candidates {
            match self.fetch_json(url, cancel).await {
                Ok(value) => return Ok(value),
                Err(IngestionError::NotFound) => {
                    tracing::debug!(url = %url, "candidate endpoint not found; trying next");
                    last_err = Some(IngestionError::NotFound);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| IngestionError::Sync("no candidate URL succeeded".to_string())))
    }

    async fn fetch_json(&self, url: &str, cancel: &CancellationToken) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            self.limiter.acquire(cancel).await?;
            let is_last = attempt + 1 >= self.retry.max_attempts;

            let request = self
                .http
                .get(url)
                .header("X-API-Key", &self.api_key)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, &self.user_agent)
                .send();

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(IngestionError::Cancelled),
                res = request => res,
            };

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if is_last {
                        return Err(IngestionError::Http(e));
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(url = %url, error = %e, attempt = attempt + 1, backoff_ms = delay.as_millis() as u64, "request error; retrying");
                    sleep_cancellable(delay, cancel).await?;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            match status.as_u16() {
                200 | 201 | 202 => {
                    let bytes = tokio::select! {
                        _ = cancel.cancelled() => return Err(IngestionError::Cancelled),
                        b = response.bytes() => b?,
                    };
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                204 => return Ok(Value::Null),
                404 => return Err(IngestionError::NotFound),
                401 => return Err(IngestionError::Unauthorized),
                403 => return Err(IngestionError::Forbidden),
                _ => {}
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = body_snippet(response).await;

            if !is_retryable_status(status) || is_last {
                return Err(IngestionError::UpstreamStatus { status: status.as_u16(), body });
            }

            let delay = self.retry.delay_for(attempt, retry_after.as_deref());
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "transient upstream status; retrying"
            );
            sleep_cancellable(delay, cancel).await?;
            attempt += 1;
        }
    }
}

/// First `MAX_ERROR_BODY_BYTES` of the body, trimmed. Read errors yield what was read so far.
async fn body_snippet(mut response: Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < MAX_ERROR_BODY_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            _ => break,
        }
    }
    buf.truncate(MAX_ERROR_BODY_BYTES);
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// A property or translation body: must be an object; empty (204) becomes an empty object.
pub fn decode_object(value: Value) -> Result<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonObject::new()),
        other => Err(IngestionError::Decode(format!(
            "expected JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// A review list: bare array, or an object carrying the array under a known envelope key.
pub fn decode_review_list(value: Value) -> Result<Vec<JsonObject>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let key = REVIEW_ENVELOPE_KEYS
                .iter()
                .find(|k| map.get(**k).map_or(false, Value::is_array))
                .ok_or_else(|| {
                    IngestionError::Decode("review envelope carries no review array".to_string())
                })?;
            match map.remove(*key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => {
            return Err(IngestionError::Decode(format!(
                "expected review array, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let reviews: Vec<JsonObject> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    if reviews.len() < total {
        tracing::warn!(skipped = total - reviews.len(), "skipping non-object review entries");
    }
    Ok(reviews)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl ContentSource for CupidClient {
    async fn get_property(&self, id: i64, cancel: &CancellationToken) -> Result<JsonObject> {
        let value = self.get_first(&self.property_urls(id), cancel).await?;
        decode_object(value)
    }

    async fn get_translation(&self, id: i64, lang: &str, cancel: &CancellationToken) -> Result<JsonObject> {
        let value = self.get_first(&self.translation_urls(id, lang), cancel).await?;
        decode_object(value)
    }

    async fn get_reviews(&self, id: i64, count: usize, cancel: &CancellationToken) -> Result<Vec<JsonObject>> {
        let value = self.get_first(&self.review_urls(id, count), cancel).await?;
        decode_review_list(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> CupidClient {
        CupidClient::new(CupidConfig {
            base_url: base.to_string(),
            api_key: "key".to_string(),
            requests_per_second: 5,
            timeout: Duration::from_secs(5),
            user_agent: "test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn candidate_urls_in_priority_order() {
        let c = client("https://api.example.test/v3.0/");
        assert_eq!(
            c.property_urls(9),
            vec!["https://api.example.test/v3.0/properties/9", "https://api.example.test/v3.0/property/9"]
        );
        assert_eq!(c.translation_urls(9, "fr")[0], "https://api.example.test/v3.0/properties/9/translations/fr");
        assert_eq!(c.translation_urls(9, "fr")[3], "https://api.example.test/v3.0/property/9/lang/fr");
        assert_eq!(
            c.review_urls(9, 10),
            vec![
                "https://api.example.test/v3.0/properties/9/reviews?limit=10",
                "https://api.example.test/v3.0/properties/9/reviews/10",
                "https://api.example.test/v3.0/property/reviews/9/10",
            ]
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let res = CupidClient::new(CupidConfig {
            base_url: "http://localhost".to_string(),
            api_key: "  ".to_string(),
            requests_per_second: 5,
            timeout: Duration::from_secs(5),
            user_agent: "test".to_string(),
        });
        assert!(matches!(res, Err(IngestionError::Configuration(_))));
    }

    #[test]
    fn review_lists_accept_arrays_and_envelopes() {
        assert_eq!(decode_review_list(json!([{"id": 1}])).unwrap().len(), 1);
        assert_eq!(decode_review_list(json!({"data": [{"id": 1}, {"id": 2}]})).unwrap().len(), 2);
        assert_eq!(decode_review_list(json!({"meta": {}, "results": [{"id": 1}]})).unwrap().len(), 1);
        assert!(decode_review_list(Value::Null).unwrap().is_empty());
        assert_eq!(decode_review_list(json!([{"id": 1}, "junk", 3])).unwrap().len(), 1);
        assert!(matches!(decode_review_list(json!({"id": 1})), Err(IngestionError::Decode(_))));
        assert!(matches!(decode_review_list(json!("nope")), Err(IngestionError::Decode(_))));
    }

    #[test]
    fn objects_required_for_property_bodies() {
        assert!(decode_object(json!({"id": 1})).is_ok());
        assert!(decode_object(Value::Null).unwrap().is_empty());
        assert!(matches!(decode_object(json!([1])), Err(IngestionError::Decode(_))));
    }

    #[tokio::test]
    async fn empty_candidate_list_is_an_error() {
        let c = client("http://127.0.0.1:9");
        let err = c.get_first(&[], &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, IngestionError::Sync(_)));
    }
}
