use serde_json::Value;

use super::{aliases, FieldMapper, ADDRESS_COMPONENTS, PROPERTY_ALIASES};
use crate::models::{Hotel, JsonObject};

impl FieldMapper {
    /// Identifier carried inside a property payload, if any.
    pub fn property_id(&self, payload: &JsonObject) -> Option<i64> {
        self.first_i64(payload, aliases(PROPERTY_ALIASES, "id"))
    }

    /// Normalize a property payload. `id` is the identifier the payload was fetched for.
    pub fn map_property(&self, id: i64, payload: &JsonObject) -> Hotel {
        Hotel {
            id,
            brand_id: self.first_i64(payload, aliases(PROPERTY_ALIASES, "brand_id")),
            stars: self
                .first_f64(payload, aliases(PROPERTY_ALIASES, "stars"))
                .map(|f| f as i32),
            lat: self.first_f64(payload, aliases(PROPERTY_ALIASES, "lat")),
            lon: self.first_f64(payload, aliases(PROPERTY_ALIASES, "lon")),
            country: self.alias_str(payload, PROPERTY_ALIASES, "country"),
            city: self.alias_str(payload, PROPERTY_ALIASES, "city"),
            address_raw: self.property_address(payload),
            amenities: self.first_string_list(payload, aliases(PROPERTY_ALIASES, "amenities")),
            images: self.first_string_list(payload, aliases(PROPERTY_ALIASES, "images")),
            raw: Value::Object(payload.clone()),
        }
    }

    /// Single address field if present, otherwise composed from components.
    pub fn property_address(&self, payload: &JsonObject) -> Option<String> {
        self.alias_str(payload, PROPERTY_ALIASES, "address")
            .or_else(|| self.compose_address(payload))
    }

    pub fn compose_address(&self, payload: &JsonObject) -> Option<String> {
        let parts: Vec<String> = ADDRESS_COMPONENTS
            .iter()
            .filter_map(|p| self.lookup_str(payload, p))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
