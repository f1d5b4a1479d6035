use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screenpick_api::{
    api::{create_router, AppState},
    config::{non_empty, Config},
    db::{create_pool, CacheStore, InMemoryProfileStore, PgProfileStore, ProfileStore},
    metrics::PerformanceMonitor,
    services::{
        providers::{
            build_http_client, ProviderClient, StreamingAvailabilityProvider, TmdbProvider,
            WatchmodeProvider,
        },
        AggregationManager, RecommendationOrchestrator, ScoringEngine,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("screenpick_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let http_client = build_http_client(config.provider_timeout());

    // Declared priority order: primary metadata first
    let providers: Vec<Arc<dyn ProviderClient>> = vec![
        Arc::new(TmdbProvider::new(
            http_client.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.response_language.clone(),
            config.region.clone(),
        )),
        Arc::new(WatchmodeProvider::new(
            http_client.clone(),
            config.watchmode_api_key.clone(),
            config.watchmode_api_url.clone(),
            config.region.clone(),
        )),
        Arc::new(StreamingAvailabilityProvider::new(
            http_client,
            config.streaming_api_key.clone(),
            config.streaming_api_url.clone(),
            &config.region,
            &config.response_language,
        )),
    ];

    let profiles: Arc<dyn ProfileStore> = match non_empty(&config.database_url) {
        Some(url) => Arc::new(PgProfileStore::new(create_pool(url).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory profile store");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    let monitor = Arc::new(PerformanceMonitor::new());
    let aggregation =
        Arc::new(AggregationManager::new(providers, config.provider_timeout(), monitor).await);
    let cache = Arc::new(CacheStore::new(config.cache_ttl()));

    let orchestrator =
        RecommendationOrchestrator::new(aggregation, cache, profiles, ScoringEngine::default())
            .with_enrichment_concurrency(config.enrichment_concurrency);

    let app = create_router(AppState::new(orchestrator));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
