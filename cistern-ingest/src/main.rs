//! cistern-ingest - CI submission ingestion service
//!
//! Accepts test/build result submissions, classifies and parses them,
//! and reconciles project-structure declarations against stored state.

use anyhow::Result;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cistern_ingest::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting cistern-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = cistern_common::config::IngestConfig::load()?;
    info!("Data root: {}", config.data_root.display());
    std::fs::create_dir_all(config.data_root.join("submissions"))?;

    info!("Database: {}", config.database_path.display());
    let db_pool = cistern_common::db::init_database(&config.database_path).await?;
    info!("Database connection established");

    let bind_address = config.bind_address;
    let state = AppState::new(db_pool, config);
    let app = cistern_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Listening on http://{bind_address}");
    info!("Health check: http://{bind_address}/health");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
