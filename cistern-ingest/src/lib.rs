//! cistern-ingest library interface
//!
//! Exposes the ingestion engine and HTTP surface for integration
//! testing.

pub mod api;
pub mod blobstore;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod notify;

pub use crate::error::{ApiError, ApiResult};

use crate::blobstore::LocalBlobStore;
use crate::ingest::{IngestContext, ProjectLocks};
use crate::notify::LogNotifier;
use axum::Router;
use chrono::{DateTime, Utc};
use cistern_common::config::IngestConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Ingestion services (database pool, config, collaborator seams)
    pub ctx: IngestContext,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: IngestConfig) -> Self {
        let blobs = Arc::new(LocalBlobStore::new(config.data_root.join("submissions")));
        Self::with_collaborators(db, config, blobs, Arc::new(LogNotifier))
    }

    /// Construct with explicit collaborators (tests swap these out).
    pub fn with_collaborators(
        db: SqlitePool,
        config: IngestConfig,
        blobs: Arc<dyn blobstore::BlobStore>,
        notifier: Arc<dyn notify::AdminNotifier>,
    ) -> Self {
        Self {
            ctx: IngestContext {
                db,
                config: Arc::new(config),
                blobs,
                notifier,
                locks: ProjectLocks::new(),
            },
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::submit_routes())
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
