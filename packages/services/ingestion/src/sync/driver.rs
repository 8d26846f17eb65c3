use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::engine::{IngestOutcome, IngestionEngine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Unique ids never started because the run was cancelled.
    pub not_started: usize,
    pub failures: Vec<(i64, String)>,
}

impl DriverReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed + self.not_started
    }
}

/// Fans hotel ids out over at most `workers` concurrent ingestions.
pub struct IngestionDriver {
    engine: Arc<IngestionEngine>,
    workers: usize,
    review_count: usize,
}

impl IngestionDriver {
    pub fn new(engine: Arc<IngestionEngine>, workers: usize, review_count: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
            review_count,
        }
    }

    /// Ingest every distinct id once. A failing hotel never stops its siblings.
    pub async fn run(&self, ids: &[i64], cancel: &CancellationToken) -> DriverReport {
        let start_time = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut report = DriverReport::default();

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.len() < ids.len() {
            tracing::debug!(duplicates = ids.len() - unique.len(), "Dropping duplicate hotel ids");
        }
        tracing::info!(hotels = unique.len(), workers = self.workers, "Starting ingestion run");

        for (launched, &id) in unique.iter().enumerate() {
            let permit = tokio::select! {
                _ = cancel.cancelled() => None,
                p = semaphore.clone().acquire_owned() => p.ok(),
            };
            let Some(permit) = permit else {
                report.not_started = unique.len() - launched;
                tracing::warn!(not_started = report.not_started, "Ingestion run cancelled before all hotels started");
                break;
            };

            let engine = self.engine.clone();
            let cancel = cancel.clone();
            let review_count = self.review_count;
            tasks.spawn(async move {
                let _permit = permit;
                let result = engine.ingest_hotel(id, review_count, &cancel).await;
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(IngestOutcome::Ingested { .. }))) => report.succeeded += 1,
                Ok((_, Ok(IngestOutcome::Skipped { .. }))) => report.skipped += 1,
                Ok((id, Err(e))) => {
                    tracing::error!(property_id = id, error = %e, "Hotel ingestion failed");
                    report.failed += 1;
                    report.failures.push((id, e.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Ingestion task aborted");
                    report.failed += 1;
                }
            }
        }
        report.failures.sort_by_key(|(id, _)| *id);

        tracing::info!(
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            not_started = report.not_started,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Ingestion run finished"
        );
        report
    }
}
