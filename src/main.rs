use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imghost_core::{CoreConfig, ImageCatalog};

/// Main entry point for the image host
///
/// Opens the catalog (creating the storage directory and metadata database if absent) and
/// serves the REST API until interrupted.
///
/// # Environment Variables
/// - `IMGHOST_REST_ADDR`: REST server address (default: "0.0.0.0:5600")
/// - `IMGHOST_STORAGE_DIR`: Directory holding image files (default: "images")
/// - `IMGHOST_DATABASE_PATH`: SQLite metadata file (default: "images.db")
/// - `IMGHOST_MAX_UPLOAD_BYTES`: Largest accepted request body (default: 25 MiB)
/// - `IMGHOST_BUSY_TIMEOUT_MS`: Wait on a locked database before failing (default: 5000)
///
/// # Errors
/// Returns an error if the configuration is invalid, the catalog cannot be opened, the address
/// cannot be bound, or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("imghost_run=info".parse()?)
                .add_directive("imghost_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("IMGHOST_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:5600".into())
        .parse()?;

    let cfg = CoreConfig::from_env_values(
        std::env::var("IMGHOST_STORAGE_DIR").ok(),
        std::env::var("IMGHOST_DATABASE_PATH").ok(),
        std::env::var("IMGHOST_BUSY_TIMEOUT_MS").ok(),
        std::env::var("IMGHOST_MAX_UPLOAD_BYTES").ok(),
    )?;
    let catalog = ImageCatalog::open(&cfg)?;

    tracing::info!(
        "++ Catalog: files in {}, metadata in {}",
        cfg.storage_dir().display(),
        cfg.database_path().display()
    );
    tracing::info!("++ Starting image host REST on {}", rest_addr);

    let app = api_rest::router(catalog, cfg.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("-- Shutting down");
}
