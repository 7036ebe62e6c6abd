use std::sync::Arc;

use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackfeel::config::{Config, StoreKind};
use trackfeel::state::AppState;
use trackfeel::store::{ActivityStore, MemoryStore, PgStore};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackfeel=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let store: Arc<dyn ActivityStore> = match config.store {
        StoreKind::Postgres => {
            let pg = PgStore::connect(&config.database_url, config.db_max_connections).await?;
            pg.run_migrations().await?;
            tracing::info!("Connected to Postgres, migrations applied");
            Arc::new(pg)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; activities are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = trackfeel::app(AppState::new(config, store));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("trackfeel listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Upload: POST http://{}/api/upload", addr);
    tracing::info!("Track: GET http://{}/api/activities/{{id}}/track", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
