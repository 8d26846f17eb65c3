use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{build_view, HotelStore};
use crate::models::*;

type ReviewKey = (i64, Option<String>, String);

#[derive(Default)]
struct State {
    hotels: HashMap<i64, Hotel>,
    i18n: HashMap<(i64, String), HotelI18n>,
    reviews: HashMap<ReviewKey, (u64, Review)>,
    misses: HashMap<(i64, String), IngestMiss>,
    next_seq: u64,
}

/// In-process store with the same contract as [`super::MongoStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn hotel(&self, id: i64) -> Option<Hotel> {
        self.state.read().await.hotels.get(&id).cloned()
    }

    pub async fn i18n(&self, id: i64, lang: &str) -> Option<HotelI18n> {
        self.state.read().await.i18n.get(&(id, lang.to_string())).cloned()
    }

    pub async fn i18n_count(&self) -> usize {
        self.state.read().await.i18n.len()
    }

    /// Reviews of one hotel, newest first.
    pub async fn reviews(&self, id: i64) -> Vec<Review> {
        let state = self.state.read().await;
        sorted_reviews(&state, id).into_iter().cloned().collect()
    }

    pub async fn review_count(&self) -> usize {
        self.state.read().await.reviews.len()
    }

    pub async fn misses(&self) -> Vec<IngestMiss> {
        let mut misses: Vec<IngestMiss> = self.state.read().await.misses.values().cloned().collect();
        misses.sort_by(|a, b| (a.property_id, &a.reason).cmp(&(b.property_id, &b.reason)));
        misses
    }
}

fn sorted_reviews(state: &State, id: i64) -> Vec<&Review> {
    let mut rows: Vec<&(u64, Review)> = state
        .reviews
        .values()
        .filter(|(_, r)| r.property_id == id)
        .collect();
    rows.sort_by(|(seq_a, a), (seq_b, b)| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| seq_b.cmp(seq_a))
    });
    rows.into_iter().map(|(_, r)| r).collect()
}

fn merge_review(existing: &mut Review, incoming: &Review) {
    fn keep_or_replace<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
        if incoming.is_some() {
            *slot = incoming.clone();
        }
    }
    keep_or_replace(&mut existing.author, &incoming.author);
    keep_or_replace(&mut existing.rating, &incoming.rating);
    keep_or_replace(&mut existing.lang, &incoming.lang);
    keep_or_replace(&mut existing.title, &incoming.title);
    keep_or_replace(&mut existing.text, &incoming.text);
    keep_or_replace(&mut existing.aspects, &incoming.aspects);
    existing.raw = incoming.raw.clone();
}

#[async_trait]
impl HotelStore for MemoryStore {
    async fn upsert_property(&self, hotel: &Hotel) -> Result<()> {
        self.state.write().await.hotels.insert(hotel.id, hotel.clone());
        Ok(())
    }

    async fn upsert_i18n(&self, i18n: &HotelI18n) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.hotels.contains_key(&i18n.property_id) {
            return Err(IngestionError::Storage(format!(
                "cannot store {} translation: hotel {} does not exist",
                i18n.lang, i18n.property_id
            )));
        }
        state
            .i18n
            .insert((i18n.property_id, i18n.lang.clone()), i18n.clone());
        Ok(())
    }

    async fn upsert_reviews(&self, reviews: &[Review]) -> Result<usize> {
        let mut state = self.state.write().await;
        for review in reviews {
            let key = (review.property_id, review.source.clone(), review.source_id.clone());
            if let Some((_, existing)) = state.reviews.get_mut(&key) {
                merge_review(existing, review);
                continue;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            let mut stored = review.clone();
            stored.created_at = Some(Utc::now());
            state.reviews.insert(key, (seq, stored));
        }
        Ok(reviews.len())
    }

    async fn record_miss(&self, property_id: i64, http_status: u16, reason: &str) -> Result<()> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        state
            .misses
            .entry((property_id, reason.to_string()))
            .and_modify(|m| m.seen_at = now)
            .or_insert_with(|| IngestMiss {
                property_id,
                http_status,
                reason: reason.to_string(),
                seen_at: now,
            });
        Ok(())
    }

    async fn get_hotel(&self, id: i64, lang: &str) -> Result<Option<HotelView>> {
        let state = self.state.read().await;
        let Some(hotel) = state.hotels.get(&id) else {
            return Ok(None);
        };
        let i18n = state.i18n.get(&(id, lang.to_string()));
        Ok(Some(build_view(hotel, i18n, lang)))
    }

    async fn list_reviews(&self, id: i64, page: &PageQuery) -> Result<ReviewsPage> {
        let state = self.state.read().await;
        let items = sorted_reviews(&state, id)
            .into_iter()
            .take(page.limit)
            .cloned()
            .collect();
        Ok(ReviewsPage { items, next_cursor: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn hotel(id: i64) -> Hotel {
        Hotel {
            id,
            brand_id: None,
            stars: Some(3),
            lat: None,
            lon: None,
            country: None,
            city: None,
            address_raw: None,
            amenities: vec![],
            images: vec![],
            raw: json!({"id": id}),
        }
    }

    fn review(id: i64, source_id: &str, text: Option<&str>) -> Review {
        Review {
            property_id: id,
            source_id: source_id.to_string(),
            author: Some("Ana".into()),
            rating: Some(8.0),
            lang: None,
            title: None,
            text: text.map(str::to_string),
            aspects: None,
            source: None,
            raw: Value::Null,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn translation_requires_hotel() {
        let store = MemoryStore::new();
        let i18n = HotelI18n {
            property_id: 9,
            lang: "en".into(),
            name: Some("x".into()),
            description: None,
            policies: None,
            address: None,
            extras: JsonObject::new(),
        };
        let err = store.upsert_i18n(&i18n).await.unwrap_err();
        assert!(matches!(err, IngestionError::Storage(_)));

        store.upsert_property(&hotel(9)).await.unwrap();
        store.upsert_i18n(&i18n).await.unwrap();
        store.upsert_i18n(&i18n).await.unwrap();
        assert_eq!(store.i18n_count().await, 1);
    }

    #[tokio::test]
    async fn review_merge_keeps_stored_values_for_absent_fields() {
        let store = MemoryStore::new();
        store.upsert_reviews(&[review(1, "r1", Some("first"))]).await.unwrap();
        let created = store.reviews(1).await[0].created_at;
        assert!(created.is_some());

        let mut update = review(1, "r1", None);
        update.author = None;
        update.rating = Some(9.5);
        store.upsert_reviews(&[update]).await.unwrap();

        let stored = store.reviews(1).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text.as_deref(), Some("first"));
        assert_eq!(stored[0].author.as_deref(), Some("Ana"));
        assert_eq!(stored[0].rating, Some(9.5));
        assert_eq!(stored[0].created_at, created);
    }

    #[tokio::test]
    async fn reviews_listed_newest_first_and_limited() {
        let store = MemoryStore::new();
        store
            .upsert_reviews(&[review(1, "a", None), review(1, "b", None), review(1, "c", None), review(2, "z", None)])
            .await
            .unwrap();
        let page = store
            .list_reviews(1, &PageQuery { limit: 2, ..PageQuery::default() })
            .await
            .unwrap();
        let ids: Vec<&str> = page.items.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"z"));
        // same-instant inserts fall back to insertion order
        let all = store.reviews(1).await;
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn repeated_miss_only_bumps_seen_at() {
        let store = MemoryStore::new();
        store.record_miss(5, 404, "not found").await.unwrap();
        let first = store.misses().await[0].seen_at;
        store.record_miss(5, 404, "not found").await.unwrap();
        store.record_miss(5, 403, "reviews").await.unwrap();
        let misses = store.misses().await;
        assert_eq!(misses.len(), 2);
        assert_eq!(misses[0].reason, "not found");
        assert!(misses[0].seen_at >= first);
        assert_eq!(misses[1].http_status, 403);
    }

    #[tokio::test]
    async fn missing_hotel_has_no_view() {
        let store = MemoryStore::new();
        assert!(store.get_hotel(1, "en").await.unwrap().is_none());
        store.upsert_property(&hotel(1)).await.unwrap();
        let view = store.get_hotel(1, "de").await.unwrap().unwrap();
        assert_eq!(view.language, "de");
        assert_eq!(view.stars, Some(3));
    }
}
