use std::path::Path;
use std::sync::Arc;

use bookwish::config::{Cli, Config};
use bookwish::db::Database;
use bookwish::handler::AppState;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables win
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("bookwish.svc starting");

    let mut cfg = Config::load(args.config_path.as_deref().map(Path::new)).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?args.config_path, "failed to load config");
        std::process::exit(1);
    });
    if let Some(port) = args.port {
        cfg.app.port = port;
    }

    let db = Arc::new(Database::connect(&cfg.database).await.unwrap_or_else(|e| {
        tracing::error!(error = %bookwish::unpack_error(&*e), "failed to setup database");
        std::process::exit(1);
    }));

    let app = bookwish::app(AppState::new(db, &cfg.app));
    let address = format!("0.0.0.0:{}", cfg.app.port);

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let cancellation_token = CancellationToken::new();
    let shutdown = cancellation_token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("ctrl+c signal received, preparing to shutdown");
        cancellation_token.cancel();
    });

    tracing::info!("bookwish.svc running on {}", &address);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    if let Err(err) = served {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }

    tracing::info!("bookwish.svc going off, graceful shutdown complete");
}
