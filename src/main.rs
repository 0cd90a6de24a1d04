use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use propmap_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, PgFavoritesLookup, PgPropertyStore, RedisRankingStore},
    routes::{create_router, AppState, Collaborators},
    services::HttpRecommender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("propmap_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let (cache, cache_writer) = Cache::new(create_redis_client(&config.redis_url)?);
    let rankings = RedisRankingStore::connect(create_redis_client(config.ranking_redis_url())?).await?;
    let recommender = HttpRecommender::new(&config.recommender_url, config.recommender_timeout())?;

    let collaborators = Collaborators {
        properties: Arc::new(PgPropertyStore::new(pool.clone())),
        favorites: Arc::new(PgFavoritesLookup::new(pool)),
        rankings: Arc::new(rankings),
        cache: Arc::new(cache),
        recommender: Arc::new(recommender),
    };
    let state = Arc::new(AppState::new(&config, collaborators));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, recommender = %config.recommender_url, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
