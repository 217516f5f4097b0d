//! Submission gatekeeping
//!
//! Blocklist rules are applied before any extraction result may be
//! committed. A blocked submission is discarded with a user-visible
//! message; it is not an error.

use crate::ingest::IngestError;
use cistern_common::db::blocklist;
use sqlx::SqlitePool;
use tracing::warn;

/// Message returned to the submitter when a blocklist rule matches.
pub const REJECTION_MESSAGE: &str = "The submission is banned from this server.";

/// Check a submission's identifying tuple against the blocklist.
pub async fn is_blocked(
    pool: &SqlitePool,
    project_id: i64,
    build_name: &str,
    site_name: &str,
    ip_address: &str,
) -> Result<bool, IngestError> {
    let banned = blocklist::is_banned(pool, project_id, build_name, site_name, ip_address).await?;
    if banned {
        warn!(
            project_id,
            build_name, site_name, ip_address, "submission is banned from this server"
        );
    }
    Ok(banned)
}
