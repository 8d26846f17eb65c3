pub mod hotel;
pub mod review;
pub mod view;

pub use hotel::*;
pub use review::*;
pub use view::*;

/// Untyped JSON object as returned by the content API.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Languages fetched during ingestion, in fetch order.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "fr", "es"];

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("upstream resource not found")]
    NotFound,

    #[error("upstream rejected credentials (401)")]
    Unauthorized,

    #[error("upstream denied access (403)")]
    Forbidden,

    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("BSON encoding error: {0}")]
    Bson(#[from] bson::ser::Error),

    #[error("BSON decoding error: {0}")]
    BsonDecode(#[from] bson::de::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("upsert reviews failed for property {property_id}: {source}")]
    ReviewUpsert {
        property_id: i64,
        #[source]
        source: Box<IngestionError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Sync error: {0}")]
    Sync(String),
}

impl IngestionError {
    /// Status recorded for outcomes that count as an ingestion miss rather than a failure.
    pub fn miss_status(&self) -> Option<u16> {
        match self {
            IngestionError::NotFound => Some(404),
            IngestionError::Unauthorized => Some(401),
            IngestionError::Forbidden => Some(403),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_classes_map_to_statuses() {
        assert_eq!(IngestionError::NotFound.miss_status(), Some(404));
        assert_eq!(IngestionError::Unauthorized.miss_status(), Some(401));
        assert_eq!(IngestionError::Forbidden.miss_status(), Some(403));
        let other = IngestionError::UpstreamStatus { status: 500, body: String::new() };
        assert_eq!(other.miss_status(), None);
        assert_eq!(IngestionError::Cancelled.miss_status(), None);
    }
}
