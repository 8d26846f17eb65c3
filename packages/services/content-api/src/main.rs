use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use hotel_content_api::{router, AppState, QueryService};
use hotel_ingestion::{logging, Cache, Config, HotelStore, MongoStore, RedisCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cfg = Config::from_env();
    logging::init_tracing(&cfg.log_format);

    let store = MongoStore::connect(&cfg.mongodb_uri, &cfg.database_name)
        .await
        .context("connecting to MongoDB")?;
    store.ensure_indexes().await.context("creating indexes")?;
    let cache = RedisCache::new(&cfg.redis_url).await.context("connecting to Redis")?;

    let store: Arc<dyn HotelStore> = Arc::new(store);
    let cache: Arc<dyn Cache> = Arc::new(cache);
    let query = Arc::new(QueryService::new(store, cache, cfg.cache_ttl()));
    let app = router(AppState { query });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, cache_ttl_secs = cfg.cache_ttl().as_secs(), "Content API listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
