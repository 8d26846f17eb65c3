use serde::{Deserialize, Serialize};

use super::Review;

pub const DEFAULT_REVIEW_LIMIT: usize = 50;
pub const MAX_REVIEW_LIMIT: usize = 200;
pub const DEFAULT_REVIEW_SORT: &str = "-created_at";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// Hotel merged with one language's localized fields, as served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelView {
    pub id: i64,
    pub stars: Option<i32>,
    pub coords: Option<Coords>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub policies: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: usize,
    pub sort: String,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REVIEW_LIMIT,
            sort: DEFAULT_REVIEW_SORT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewsPage {
    pub items: Vec<Review>,
    pub next_cursor: Option<String>,
}
