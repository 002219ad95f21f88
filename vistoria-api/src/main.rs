//! vistoria-api - Field inspection management service
//!
//! Backend for field inspections (vistorias): checklist-driven lifecycle
//! from draft through finalization and adjustment resolution, plus the
//! offline sync endpoint used by the mobile client.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vistoria_api::services::gateway::CloudinaryGateway;
use vistoria_api::AppState;
use vistoria_common::config::{
    database_path, ensure_root_folder, resolve_root_folder, GatewayConfig,
};

/// Command-line arguments for vistoria-api
#[derive(Parser, Debug)]
#[command(name = "vistoria-api")]
#[command(about = "Field inspection management service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "VISTORIA_PORT")]
    port: u16,

    /// Data root folder (database lives here)
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vistoria_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting vistoria-api v{} (build {}, {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    ensure_root_folder(&root_folder)
        .with_context(|| format!("failed to create root folder {}", root_folder.display()))?;

    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db = vistoria_common::db::init_database(&db_path)
        .await
        .context("failed to initialize database")?;

    let gateway_config = GatewayConfig::from_env().context("invalid CLOUDINARY_URL")?;
    if gateway_config.is_none() {
        info!("CLOUDINARY_URL not set; evidence uploads will fail with upstream errors");
    }
    let gateway = Arc::new(CloudinaryGateway::new(gateway_config));

    let state = AppState::new(db, gateway);
    let app = vistoria_api::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
