use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::{hotel_key, review_listing_keys, Cache};
use crate::clients::ContentSource;
use crate::mapping::FieldMapper;
use crate::models::*;
use crate::storage::HotelStore;

/// What happened to one hotel. Misses on the property itself are a steady state, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested { reviews: usize, languages: Vec<String> },
    Skipped { status: u16, reason: String },
}

/// Per-hotel workflow: property, then reviews, then each supported language.
/// Every write is followed by eviction of the cache keys that could serve the old content.
pub struct IngestionEngine {
    source: Arc<dyn ContentSource>,
    store: Arc<dyn HotelStore>,
    cache: Arc<dyn Cache>,
    field_mapper: FieldMapper,
}

impl IngestionEngine {
    pub fn new(source: Arc<dyn ContentSource>, store: Arc<dyn HotelStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            source,
            store,
            cache,
            field_mapper: FieldMapper::new(),
        }
    }

    pub async fn ingest_hotel(
        &self,
        id: i64,
        review_count: usize,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let start_time = Instant::now();
        tracing::debug!(property_id = id, "Starting hotel ingestion");

        // Property
        let payload = match self.source.get_property(id, cancel).await {
            Ok(payload) => payload,
            Err(e) => {
                let Some(status) = e.miss_status() else {
                    return Err(e);
                };
                let reason = if status == 404 { "not found" } else { "inactive" };
                self.note_miss(id, status, reason).await;
                for lang in SUPPORTED_LANGUAGES {
                    self.invalidate(&hotel_key(id, lang)).await;
                }
                self.invalidate_reviews(id).await;
                tracing::info!(property_id = id, status = status, reason = reason, "Hotel skipped");
                return Ok(IngestOutcome::Skipped { status, reason: reason.to_string() });
            }
        };

        if let Some(payload_id) = self.field_mapper.property_id(&payload) {
            if payload_id != id {
                tracing::warn!(property_id = id, payload_id = payload_id, "Payload carries a different hotel id; keeping the requested one");
            }
        }
        let hotel = self.field_mapper.map_property(id, &payload);
        self.store.upsert_property(&hotel).await?;
        for lang in SUPPORTED_LANGUAGES {
            self.invalidate(&hotel_key(id, lang)).await;
        }

        // Reviews
        let mut review_total = 0;
        match self.source.get_reviews(id, review_count, cancel).await {
            Ok(items) => {
                if !items.is_empty() {
                    let reviews = self.field_mapper.map_reviews(id, &items);
                    review_total = self.store.upsert_reviews(&reviews).await.map_err(|e| {
                        IngestionError::ReviewUpsert { property_id: id, source: Box::new(e) }
                    })?;
                }
                self.invalidate_reviews(id).await;
            }
            Err(e) => {
                let Some(status) = e.miss_status() else {
                    return Err(e);
                };
                self.note_miss(id, status, "reviews").await;
                self.invalidate_reviews(id).await;
            }
        }

        // Translations
        let mut languages = Vec::with_capacity(SUPPORTED_LANGUAGES.len());
        for lang in SUPPORTED_LANGUAGES {
            match self.source.get_translation(id, lang, cancel).await {
                Ok(payload) => {
                    let i18n = self.field_mapper.map_translation(id, lang, &payload);
                    self.store.upsert_i18n(&i18n).await?;
                    self.invalidate(&hotel_key(id, lang)).await;
                    languages.push(lang.to_string());
                }
                Err(e) => {
                    let Some(status) = e.miss_status() else {
                        return Err(e);
                    };
                    self.note_miss(id, status, &format!("i18n:{}", lang)).await;
                    self.invalidate(&hotel_key(id, lang)).await;
                }
            }
        }

        tracing::info!(
            property_id = id,
            reviews = review_total,
            languages = ?languages,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Hotel ingested"
        );
        Ok(IngestOutcome::Ingested { reviews: review_total, languages })
    }

    async fn note_miss(&self, id: i64, status: u16, reason: &str) {
        if let Err(e) = self.store.record_miss(id, status, reason).await {
            tracing::warn!(property_id = id, status = status, reason = reason, error = %e, "Failed to record ingestion miss");
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(key = key, error = %e, "Cache invalidation failed");
        }
    }

    async fn invalidate_reviews(&self, id: i64) {
        for key in review_listing_keys(id) {
            self.invalidate(&key).await;
        }
    }
}
