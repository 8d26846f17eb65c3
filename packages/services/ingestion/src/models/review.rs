use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aspects {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pros: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cons: Vec<String>,
}

impl Aspects {
    pub fn is_empty(&self) -> bool {
        self.pros.is_empty() && self.cons.is_empty()
    }
}

/// A guest review. Natural key is (property_id, source, source_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub property_id: i64,
    pub source_id: String,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub aspects: Option<Aspects>,
    pub source: Option<String>,
    pub raw: Value,
    /// Assigned by the store on first insert; absent on freshly mapped reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
