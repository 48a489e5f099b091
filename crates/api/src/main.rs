//! Movie catalog API server

use std::sync::Arc;

use anyhow::Context;
use movie_catalog_api::{
    poster::{PosterLookup, TmdbClient},
    routes::create_router,
    AppState, Config,
};
use movie_catalog_shared::{
    create_pool, run_migrations, DatabaseRepo, InMemoryRepository, PostgresRepository,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MEMORY_DATABASE_URL: &str = "memory://";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(bind_address = %config.bind_address, "Starting movie catalog API");

    let repo = connect_store(&config).await?;

    let posters = TmdbClient::from_config(&config.tmdb_api_key, &config.tmdb_base_url)
        .context("failed to build TMDB client")?
        .map(|client| Arc::new(client) as Arc<dyn PosterLookup>);

    let bind_address = config.bind_address.clone();
    let app = create_router(AppState::new(config, repo, posters));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped gracefully");
    Ok(())
}

/// `RUST_LOG` filtering, JSON output when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("movie_catalog_api=debug,tower_http=info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Pick the store backend from `DATABASE_URL`
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn DatabaseRepo>> {
    if config.database_url.starts_with(MEMORY_DATABASE_URL) {
        warn!("Using the in-memory store, data will not survive a restart");
        return Ok(Arc::new(InMemoryRepository::with_default_genres()));
    }

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")?;
    info!("Database connection pool created");

    if config.run_migrations {
        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;
        info!("Database migrations applied");
    }

    Ok(Arc::new(PostgresRepository::new(pool)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
