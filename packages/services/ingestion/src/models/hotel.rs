use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::JsonObject;

/// Normalized hotel property. `raw` keeps the full upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: i64,
    pub brand_id: Option<i64>,
    pub stars: Option<i32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address_raw: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub raw: Value,
}

/// Per-language fields of a hotel, one record per (property_id, lang).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelI18n {
    pub property_id: i64,
    pub lang: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub policies: Option<String>,
    pub address: Option<String>,
    pub extras: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestMiss {
    pub property_id: i64,
    pub http_status: u16,
    pub reason: String,
    pub seen_at: chrono::DateTime<chrono::Utc>,
}
