//! Storage port. Only ingestion writes; nothing is ever deleted.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;

use crate::models::*;

#[async_trait]
pub trait HotelStore: Send + Sync {
    /// Insert or overwrite the normalized fields of a hotel, keyed by id.
    async fn upsert_property(&self, hotel: &Hotel) -> Result<()>;

    /// Insert or replace the localized fields for `(property_id, lang)`.
    /// Fails with [`IngestionError::Storage`] if the hotel is unknown.
    async fn upsert_i18n(&self, i18n: &HotelI18n) -> Result<()>;

    /// Upsert by natural key `(property_id, source, source_id)`. Absent incoming
    /// fields keep the stored value. Returns the number of reviews written.
    async fn upsert_reviews(&self, reviews: &[Review]) -> Result<usize>;

    async fn record_miss(&self, property_id: i64, http_status: u16, reason: &str) -> Result<()>;

    async fn get_hotel(&self, id: i64, lang: &str) -> Result<Option<HotelView>>;

    /// Newest first by `created_at`, ties broken by insertion order (newest first).
    async fn list_reviews(&self, id: i64, page: &PageQuery) -> Result<ReviewsPage>;
}

/// Merge a hotel with one language's localized fields.
pub fn build_view(hotel: &Hotel, i18n: Option<&HotelI18n>, lang: &str) -> HotelView {
    let localized_address = i18n
        .and_then(|t| t.address.as_deref())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    HotelView {
        id: hotel.id,
        stars: hotel.stars,
        coords: match (hotel.lat, hotel.lon) {
            (Some(lat), Some(lon)) => Some(Coords { lat, lon }),
            _ => None,
        },
        country: hotel.country.clone(),
        city: hotel.city.clone(),
        address: localized_address.or_else(|| hotel.address_raw.clone()),
        name: i18n.and_then(|t| t.name.clone()),
        description: i18n.and_then(|t| t.description.clone()),
        policies: i18n.and_then(|t| t.policies.clone()),
        amenities: hotel.amenities.clone(),
        images: hotel.images.clone(),
        language: lang.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn hotel() -> Hotel {
        Hotel {
            id: 1,
            brand_id: None,
            stars: Some(4),
            lat: Some(41.0),
            lon: None,
            country: Some("TR".into()),
            city: Some("Istanbul".into()),
            address_raw: Some("Base address".into()),
            amenities: vec!["Pool".into()],
            images: vec![],
            raw: Value::Null,
        }
    }

    fn i18n(address: Option<&str>) -> HotelI18n {
        HotelI18n {
            property_id: 1,
            lang: "fr".into(),
            name: Some("Hôtel".into()),
            description: None,
            policies: None,
            address: address.map(str::to_string),
            extras: JsonObject::new(),
        }
    }

    #[test]
    fn coords_need_both_components() {
        let mut h = hotel();
        assert_eq!(build_view(&h, None, "en").coords, None);
        h.lon = Some(29.0);
        assert_eq!(build_view(&h, None, "en").coords, Some(Coords { lat: 41.0, lon: 29.0 }));
    }

    #[test]
    fn localized_address_wins_unless_blank() {
        let h = hotel();
        let view = build_view(&h, Some(&i18n(Some("Adresse FR"))), "fr");
        assert_eq!(view.address.as_deref(), Some("Adresse FR"));
        assert_eq!(view.name.as_deref(), Some("Hôtel"));
        assert_eq!(view.language, "fr");

        let view = build_view(&h, Some(&i18n(Some("   "))), "fr");
        assert_eq!(view.address.as_deref(), Some("Base address"));

        let view = build_view(&h, None, "es");
        assert_eq!(view.address.as_deref(), Some("Base address"));
        assert_eq!(view.name, None);
    }
}
