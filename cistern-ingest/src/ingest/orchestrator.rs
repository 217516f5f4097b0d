//! Ingestion orchestration
//!
//! Top-level control flow for one submission: try the pre-registered
//! record path first, fall back to sniffing the inline stream, and
//! produce either a populated handler result, a "dropped, nothing to
//! do", a blocklist rejection, or a structured failure.

use crate::blobstore::BlobStore;
use crate::handlers::{build_properties, Handler, HandlerResult};
use crate::ingest::backup::encode_backup_filename;
use crate::ingest::classify::{Format, SubmissionKind};
use crate::ingest::locks::ProjectLocks;
use crate::ingest::{dispatch, gatekeeper, IngestError, CHUNK_SIZE};
use crate::notify::AdminNotifier;
use cistern_common::config::IngestConfig;
use cistern_common::db::{builds, projects, submissions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{error, info};

/// Shared services the orchestrator operates on.
#[derive(Clone)]
pub struct IngestContext {
    pub db: SqlitePool,
    pub config: Arc<IngestConfig>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn AdminNotifier>,
    pub locks: ProjectLocks,
}

/// Terminal state of one submission.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Facts extracted and committed; the backup filename is set.
    Parsed(Box<HandlerResult>),
    /// The declared kind has no handler here; the pending record was
    /// discarded and nothing was produced. Not an error.
    Dropped,
    /// A blocklist rule matched; the parse result was discarded.
    Blocked,
}

enum RegisteredOutcome {
    /// No record (or incomplete metadata) for the checksum; the caller
    /// falls through to the inline path.
    NoRecord,
    Dropped,
    Parsed(Box<HandlerResult>),
}

enum Payload<R> {
    /// The capped prefix read already held the entire payload.
    Buffer(Vec<u8>),
    Stream(R),
}

/// Ingest one submission.
///
/// The stream is consumed only by the inline path; a pre-registered
/// submission's bytes are read from their materialized location.
pub async fn ingest_submission<R>(
    ctx: &IngestContext,
    stream: R,
    project_id: i64,
    expected_checksum: Option<&str>,
    remote_ip: Option<&str>,
) -> Result<IngestOutcome, IngestError>
where
    R: AsyncRead + Unpin,
{
    if let Some(checksum) = expected_checksum.filter(|c| !c.is_empty()) {
        match parse_registered_submission(ctx, project_id, checksum).await? {
            RegisteredOutcome::NoRecord => {}
            RegisteredOutcome::Dropped => return Ok(IngestOutcome::Dropped),
            RegisteredOutcome::Parsed(result) => return Ok(IngestOutcome::Parsed(result)),
        }
    }
    parse_inline_submission(ctx, stream, project_id, remote_ip).await
}

/// The pre-registered path: checksum -> record -> declared kind.
async fn parse_registered_submission(
    ctx: &IngestContext,
    project_id: i64,
    checksum: &str,
) -> Result<RegisteredOutcome, IngestError> {
    let Some(record) = submissions::find_record(&ctx.db, checksum).await? else {
        return Ok(RegisteredOutcome::NoRecord);
    };
    let Some(project_name) = projects::project_name(&ctx.db, project_id).await? else {
        return Ok(RegisteredOutcome::NoRecord);
    };
    let Some(build) = builds::find_build(&ctx.db, record.build_id).await? else {
        return Ok(RegisteredOutcome::NoRecord);
    };
    let Some(site_name) = builds::site_name_for_build(&ctx.db, record.build_id).await? else {
        return Ok(RegisteredOutcome::NoRecord);
    };

    let Some(kind) = SubmissionKind::from_declared(&record.kind) else {
        error!(
            project_id,
            kind = %record.kind,
            "no handler for declared submission kind, dropping submission"
        );
        submissions::delete_record(&ctx.db, checksum).await?;
        return Ok(RegisteredOutcome::Dropped);
    };

    // The bytes were materialized under the record's filename: either a
    // plain local path or a blob in the store.
    let path = if tokio::fs::try_exists(&record.filename).await.unwrap_or(false) {
        PathBuf::from(&record.filename)
    } else if let Some(path) = ctx.blobs.resolve(&record.filename) {
        path
    } else {
        return Err(IngestError::Location(record.filename.clone()));
    };

    let file = tokio::fs::File::open(&path).await?;
    // A parse failure propagates here with the record still in place,
    // so a corrected re-upload with the same checksum can retry.
    let mut result = parse_payload(ctx, kind, project_id, Payload::Stream(file)).await?;

    submissions::delete_record(&ctx.db, checksum).await?;
    result.backup_file_name = encode_backup_filename(
        &project_name,
        "",
        &build.name,
        &site_name,
        &build.stamp,
        &record.filename,
    );
    info!(
        project_id,
        kind = %kind,
        backup = %result.backup_file_name,
        "registered submission parsed"
    );
    Ok(RegisteredOutcome::Parsed(Box::new(result)))
}

/// The inline path: sniff one capped prefix chunk, gate, parse.
async fn parse_inline_submission<R>(
    ctx: &IngestContext,
    mut stream: R,
    project_id: i64,
    remote_ip: Option<&str>,
) -> Result<IngestOutcome, IngestError>
where
    R: AsyncRead + Unpin,
{
    let ip = remote_ip.unwrap_or("");

    let mut prefix = Vec::with_capacity(CHUNK_SIZE);
    (&mut stream)
        .take(CHUNK_SIZE as u64)
        .read_to_end(&mut prefix)
        .await?;
    let whole_payload = prefix.len() < CHUNK_SIZE;

    let Some(kind) = SubmissionKind::sniff(&prefix) else {
        let excerpt = excerpt_of(&prefix);
        let project_name = projects::project_name(&ctx.db, project_id)
            .await?
            .unwrap_or_else(|| "NA".to_string());
        error!(project_id, "could not create handler based on submission content");
        ctx.notifier.notify_project_admins(
            project_id,
            "Cannot determine submission type",
            &format!(
                "A submission from {ip} to project {project_name} could not be classified. \
                 The content begins: {excerpt}"
            ),
        );
        return Err(IngestError::Classification { excerpt });
    };

    // Structure submissions write while parsing, so their gate runs
    // first; their build/site facts are empty by definition, leaving
    // the origin address as the only matchable field.
    if kind == SubmissionKind::Project
        && gatekeeper::is_blocked(&ctx.db, project_id, "", "", ip).await?
    {
        return Ok(IngestOutcome::Blocked);
    }

    let mut result = if whole_payload {
        parse_payload(ctx, kind, project_id, Payload::<R>::Buffer(prefix)).await?
    } else {
        let chained = std::io::Cursor::new(prefix).chain(stream);
        parse_payload(ctx, kind, project_id, Payload::Stream(chained)).await?
    };

    // All other kinds accumulate purely in memory; gate on the facts
    // they extracted before anything is committed.
    if kind != SubmissionKind::Project {
        let build_name = result.build_name.clone().unwrap_or_default();
        let site_name = result.site_name.clone().unwrap_or_default();
        if gatekeeper::is_blocked(&ctx.db, project_id, &build_name, &site_name, ip).await? {
            return Ok(IngestOutcome::Blocked);
        }
    }

    let project_name = projects::project_name(&ctx.db, project_id)
        .await?
        .unwrap_or_else(|| "NA".to_string());
    result.backup_file_name = encode_backup_filename(
        &project_name,
        result.subproject_name.as_deref().unwrap_or(""),
        result.build_name.as_deref().unwrap_or(""),
        result.site_name.as_deref().unwrap_or(""),
        result.build_stamp.as_deref().unwrap_or(""),
        &kind.original_filename(),
    );
    info!(
        project_id,
        kind = %kind,
        backup = %result.backup_file_name,
        "inline submission parsed"
    );
    Ok(IngestOutcome::Parsed(Box::new(result)))
}

/// Run the payload through the handler for its kind. Both payload arms
/// drive the same parser and produce identical event order.
async fn parse_payload<R>(
    ctx: &IngestContext,
    kind: SubmissionKind,
    project_id: i64,
    payload: Payload<R>,
) -> Result<HandlerResult, IngestError>
where
    R: AsyncRead + Unpin,
{
    match kind.format() {
        Format::Json => {
            let bytes = match payload {
                Payload::Buffer(bytes) => bytes,
                Payload::Stream(mut stream) => {
                    let mut bytes = Vec::new();
                    stream.read_to_end(&mut bytes).await?;
                    bytes
                }
            };
            let document = build_properties::parse_build_properties(&bytes)?;
            Ok(HandlerResult::from_json(kind, document))
        }
        Format::Xml => {
            // Reconciliation for one project must not interleave with
            // another submission for the same project.
            let _guard = if kind == SubmissionKind::Project {
                Some(ctx.locks.acquire(project_id).await)
            } else {
                None
            };

            let Some(mut handler) = Handler::for_kind(
                kind,
                ctx.db.clone(),
                project_id,
                ctx.config.delete_old_subprojects,
            ) else {
                // JSON kinds were handled above; every XML kind resolves.
                return Err(IngestError::Other(anyhow::anyhow!(
                    "no event handler for kind {kind}"
                )));
            };

            match payload {
                Payload::Buffer(bytes) => dispatch::parse_buffer(&bytes, &mut handler).await?,
                Payload::Stream(stream) => dispatch::parse_stream(stream, &mut handler).await?,
            }
            Ok(handler.into_result())
        }
    }
}

fn excerpt_of(prefix: &[u8]) -> String {
    let len = prefix.len().min(1024);
    String::from_utf8_lossy(&prefix[..len]).into_owned()
}
