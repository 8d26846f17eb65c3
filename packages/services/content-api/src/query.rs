use std::sync::Arc;
use std::time::Duration;

use hotel_ingestion::{
    get_json, hotel_key, reviews_key, set_json, Cache, HotelStore, HotelView, PageQuery, Result,
    ReviewsPage,
};

/// Review pages larger than this are served but not cached.
const MAX_CACHED_PAGE_BYTES: usize = 1_000_000;

/// Cache-aside reads over the hotel store, keyed exactly as the ingestor invalidates.
pub struct QueryService {
    store: Arc<dyn HotelStore>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl QueryService {
    pub fn new(store: Arc<dyn HotelStore>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn get_hotel(&self, id: i64, lang: &str) -> Result<Option<HotelView>> {
        let key = hotel_key(id, lang);
        match get_json::<HotelView>(self.cache.as_ref(), &key).await {
            Ok(Some(view)) => return Ok(Some(view)),
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed; falling back to store"),
        }

        let view = self.store.get_hotel(id, lang).await?;
        if let Some(view) = &view {
            if let Err(e) = set_json(self.cache.as_ref(), &key, view, self.ttl).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            }
        }
        Ok(view)
    }

    pub async fn list_reviews(&self, id: i64, page: &PageQuery) -> Result<ReviewsPage> {
        let key = reviews_key(id, page.limit, &page.sort);
        match get_json::<ReviewsPage>(self.cache.as_ref(), &key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed; falling back to store"),
        }

        let result = self.store.list_reviews(id, page).await?;
        match serde_json::to_string(&result) {
            Ok(raw) if raw.len() < MAX_CACHED_PAGE_BYTES => {
                if let Err(e) = self.cache.set(&key, &raw, self.ttl).await {
                    tracing::warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Ok(raw) => tracing::debug!(key = %key, bytes = raw.len(), "Review page too large to cache"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode review page for cache"),
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_ingestion::{Hotel, MemoryCache, MemoryStore};
    use serde_json::Value;

    fn hotel(id: i64) -> Hotel {
        Hotel {
            id,
            brand_id: None,
            stars: Some(5),
            lat: None,
            lon: None,
            country: None,
            city: Some("Paris".into()),
            address_raw: None,
            amenities: vec![],
            images: vec![],
            raw: Value::Null,
        }
    }

    #[tokio::test]
    async fn hotel_reads_populate_and_reuse_cache() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        store.upsert_property(&hotel(1)).await.unwrap();
        let svc = QueryService::new(Arc::new(store.clone()), Arc::new(cache.clone()), Duration::from_secs(60));

        let first = svc.get_hotel(1, "en").await.unwrap().unwrap();
        assert!(cache.contains("hotel:1:en").await);

        // a store change is invisible until the key is evicted
        let mut changed = hotel(1);
        changed.stars = Some(2);
        store.upsert_property(&changed).await.unwrap();
        assert_eq!(svc.get_hotel(1, "en").await.unwrap().unwrap(), first);

        cache.delete("hotel:1:en").await.unwrap();
        assert_eq!(svc.get_hotel(1, "en").await.unwrap().unwrap().stars, Some(2));
    }

    #[tokio::test]
    async fn missing_hotels_are_not_cached() {
        let cache = MemoryCache::new();
        let svc = QueryService::new(Arc::new(MemoryStore::new()), Arc::new(cache.clone()), Duration::from_secs(60));
        assert!(svc.get_hotel(9, "en").await.unwrap().is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn review_pages_cached_under_listing_key() {
        let cache = MemoryCache::new();
        let svc = QueryService::new(Arc::new(MemoryStore::new()), Arc::new(cache.clone()), Duration::from_secs(60));
        let page = svc.list_reviews(3, &PageQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert!(cache.contains("reviews:3:50:-created_at").await);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_back_to_store() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        store.upsert_property(&hotel(1)).await.unwrap();
        cache.set("hotel:1:en", "not json", Duration::from_secs(60)).await.unwrap();
        let svc = QueryService::new(Arc::new(store), Arc::new(cache), Duration::from_secs(60));
        assert_eq!(svc.get_hotel(1, "en").await.unwrap().unwrap().city.as_deref(), Some("Paris"));
    }
}
