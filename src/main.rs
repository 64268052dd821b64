use std::sync::Arc;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use motor_monitoring_service::{
    api::{self, AppState},
    config::Config,
    db,
    store::PgReadingStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env; a missing file is fine when env vars are set externally.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    // The pool is lazy: the server comes up even if Postgres is not reachable yet.
    let pool = db::create_pool(&config)?;
    match db::run_migrations(&pool).await {
        Ok(()) => info!("Database ready"),
        Err(e) => error!(error = %e, "Database migrations failed; continuing without schema sync"),
    }

    let store = PgReadingStore::new(pool);
    let state = AppState::new(Arc::new(store.clone()));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        environment = config.environment.as_str(),
        "HTTP server listening"
    );

    axum::serve(listener, api::router(state, config.environment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Database pool closed");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
