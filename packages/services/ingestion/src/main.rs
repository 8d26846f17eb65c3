use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use hotel_ingestion::{
    logging, parse_property_ids, Cache, Config, CupidClient, HotelStore, IngestionDriver,
    IngestionEngine, MongoStore, RedisCache,
};

#[derive(Parser, Debug)]
#[command(name = "hotel-ingestor")]
#[command(about = "Fetch hotel content from the Cupid API and persist it")]
struct Cli {
    /// Comma-separated hotel ids; overrides PROPERTY_IDS
    #[arg(long, value_delimiter = ',')]
    ids: Vec<i64>,

    /// File with one hotel id per line (`#` comments allowed)
    #[arg(long)]
    ids_file: Option<PathBuf>,

    /// Concurrent hotel workflows; overrides INGEST_WORKERS
    #[arg(long)]
    workers: Option<usize>,

    /// Reviews requested per hotel; overrides INGEST_REVIEW_COUNT
    #[arg(long)]
    reviews: Option<usize>,

    /// Cancel the whole run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut cfg = Config::from_env();
    logging::init_tracing(&cfg.log_format);

    if let Some(workers) = cli.workers {
        cfg.ingest_workers = workers;
    }
    if let Some(reviews) = cli.reviews {
        cfg.ingest_review_count = reviews;
    }
    cfg.validate_for_ingestion()?;

    let ids = resolve_ids(&cli, &cfg)?;
    if ids.is_empty() {
        anyhow::bail!("no hotel ids given: use --ids, --ids-file or PROPERTY_IDS");
    }

    tracing::info!(
        base = %cfg.cupid_base_url,
        database = %cfg.database_name,
        workers = cfg.ingest_workers,
        reviews = cfg.ingest_review_count,
        hotels = ids.len(),
        "Ingestor starting"
    );

    let store = MongoStore::connect(&cfg.mongodb_uri, &cfg.database_name)
        .await
        .context("connecting to MongoDB")?;
    store.ensure_indexes().await.context("creating indexes")?;
    let cache = RedisCache::new(&cfg.redis_url).await.context("connecting to Redis")?;
    let client = CupidClient::new(cfg.cupid_config())?;

    let store: Arc<dyn HotelStore> = Arc::new(store);
    let cache: Arc<dyn Cache> = Arc::new(cache);
    let engine = Arc::new(IngestionEngine::new(Arc::new(client), store, cache));
    let driver = IngestionDriver::new(engine, cfg.ingest_workers, cfg.ingest_review_count);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let timeout = cli.timeout_secs.map(Duration::from_secs);
        tokio::spawn(async move {
            match timeout {
                Some(limit) => tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::warn!("Interrupted; cancelling ingestion"),
                    _ = tokio::time::sleep(limit) => tracing::warn!(timeout_secs = limit.as_secs(), "Run timed out; cancelling ingestion"),
                },
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::warn!("Interrupted; cancelling ingestion");
                }
            }
            cancel.cancel();
        });
    }

    let report = driver.run(&ids, &cancel).await;
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "Some hotels failed to ingest");
    }
    tracing::info!("Ingestion completed");
    Ok(())
}

fn resolve_ids(cli: &Cli, cfg: &Config) -> anyhow::Result<Vec<i64>> {
    let mut ids = cli.ids.clone();
    if let Some(path) = &cli.ids_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        ids.extend(parse_property_ids(&raw)?);
    }
    if ids.is_empty() {
        if let Some(raw) = &cfg.property_ids {
            ids = parse_property_ids(raw)?;
        }
    }
    Ok(ids)
}
