//! The ingestion engine
//!
//! Classification, streaming parse dispatch, gatekeeping, and the
//! orchestrator that ties them to the handler state machines.

pub mod backup;
pub mod classify;
pub mod dispatch;
pub mod gatekeeper;
pub mod locks;
pub mod orchestrator;

pub use classify::{Format, SubmissionKind};
pub use dispatch::{parse_buffer, parse_stream, ParseError, CHUNK_SIZE};
pub use locks::ProjectLocks;
pub use orchestrator::{ingest_submission, IngestContext, IngestOutcome};

use thiserror::Error;

/// Per-submission failure taxonomy.
///
/// Every variant aborts only the current submission; the service keeps
/// serving subsequent ones.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Sniffed content matches no known submission kind (fatal,
    /// surfaced to the submitter as a bad request).
    #[error("could not determine submission type from content")]
    Classification { excerpt: String },

    /// Neither a local path nor blob storage holds the expected bytes
    /// of a pre-registered submission.
    #[error("failed to locate submission file: {0}")]
    Location(String),

    /// The incremental parser reported malformed input.
    #[error("failed to parse submission: {0}")]
    Parse(#[from] ParseError),

    /// Database error raised directly by the engine.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error from the shared data layer.
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// I/O error reading the submission stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
