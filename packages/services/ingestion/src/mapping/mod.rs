//! Normalization of loosely-shaped content API payloads.
//!
//! Every normalized attribute is resolved through an ordered alias list; the first
//! candidate path that yields a non-empty value wins. Mapping never fails: missing or
//! malformed fields become `None`.

mod property;
mod review;
mod translation;

use serde_json::Value;

use crate::models::JsonObject;

/// Ordered candidate paths per logical attribute. Order is priority.
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

pub const REVIEW_ALIASES: AliasTable = &[
    ("author", &["author", "name", "userName", "reviewer", "reviewer.name"]),
    ("author_first", &["first_name", "firstname", "user.first_name", "user.firstName"]),
    ("author_last", &["last_name", "lastname", "user.last_name", "user.lastName"]),
    ("title", &["title", "review_title", "headline", "summary"]),
    ("text", &["text", "review_text", "review", "comment", "content", "body", "message"]),
    ("lang", &["lang", "language", "language_code", "languageCode", "locale"]),
    ("source", &["source", "platform", "provider", "site", "origin"]),
    ("source_id", &["id", "review_id", "reviewId"]),
    (
        "rating",
        &["rating", "rate", "score", "rating.value", "scores.overall", "overall_score", "average_score"],
    ),
];

pub const I18N_ALIASES: AliasTable = &[
    ("name", &["name", "hotel_name", "translations.name"]),
    (
        "description",
        &["description", "markdown_description", "translations.description", "description_long"],
    ),
    ("policies", &["policies", "important_info", "translations.policies"]),
    (
        "address",
        &[
            "address",
            "address.line",
            "address_raw",
            "full_address",
            "address1",
            "address_line1",
            "location.address",
            "street",
            "street_address",
        ],
    ),
];

pub const PROPERTY_ALIASES: AliasTable = &[
    ("id", &["hotel_id", "cupid_id", "id"]),
    ("brand_id", &["chain_id", "brand_id"]),
    ("stars", &["stars", "rating.stars", "rating"]),
    ("lat", &["latitude", "lat", "location.lat"]),
    ("lon", &["longitude", "lon", "lng", "location.lon", "location.lng"]),
    ("country", &["address.country", "country", "countryCode", "country_code"]),
    ("city", &["address.city", "city", "locality", "town"]),
    (
        "address",
        &["address_raw", "address", "address.line", "full_address", "location.address", "formatted_address"],
    ),
    ("amenities", &["facilities", "amenities"]),
    ("images", &["photos", "images"]),
];

/// Component paths used to compose an address when no single field is present.
pub const ADDRESS_COMPONENTS: &[&str] = &[
    "address.addressLine1",
    "address.addressLine2",
    "address.street",
    "address.district",
    "address.city",
    "address.state",
    "address.postcode",
    "address.zip",
    "address.country",
    "street",
    "city",
    "postcode",
    "zip",
    "country",
];

/// Candidate paths for a logical attribute; empty when the table has no such key.
pub fn aliases(table: AliasTable, key: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, paths)| *paths)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    pub fn new() -> Self {
        Self
    }

    /// Dot-path descent through nested objects. Any non-object along the way yields `None`.
    pub fn extract_value_by_path<'a>(&self, data: &'a JsonObject, path: &str) -> Option<&'a Value> {
        let mut parts = path.split('.');
        let mut current = data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn is_empty_value(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    /// Trimmed, non-empty string at `path`. Non-string values are ignored.
    pub fn lookup_str(&self, data: &JsonObject, path: &str) -> Option<String> {
        let s = self.extract_value_by_path(data, path)?.as_str()?.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }

    pub fn first_str(&self, data: &JsonObject, paths: &[&str]) -> Option<String> {
        paths.iter().find_map(|p| self.lookup_str(data, p))
    }

    pub fn alias_str(&self, data: &JsonObject, table: AliasTable, key: &str) -> Option<String> {
        self.first_str(data, aliases(table, key))
    }

    /// First numeric value among `paths`. Strings are accepted, with `,` as decimal separator.
    pub fn first_f64(&self, data: &JsonObject, paths: &[&str]) -> Option<f64> {
        paths.iter().find_map(|p| match self.extract_value_by_path(data, p)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let normalized = s.replace(',', ".");
                let trimmed = normalized.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
                }
            }
            _ => None,
        })
    }

    pub fn first_i64(&self, data: &JsonObject, paths: &[&str]) -> Option<i64> {
        paths.iter().find_map(|p| match self.extract_value_by_path(data, p)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }

    /// First non-empty list among `paths`. Elements may be strings or objects carrying
    /// `url`, `src` or `name`.
    pub fn first_string_list(&self, data: &JsonObject, paths: &[&str]) -> Vec<String> {
        for path in paths {
            let Some(items) = self.extract_value_by_path(data, path).and_then(Value::as_array) else {
                continue;
            };
            let out: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim()),
                    Value::Object(obj) => ["url", "src", "name"].iter().find_map(|k| {
                        obj.get(*k)
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                    }),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !out.is_empty() {
                return out;
            }
        }
        Vec::new()
    }
}
