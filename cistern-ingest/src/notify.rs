//! Admin notification collaborator
//!
//! Fire-and-forget: implementations must swallow their own delivery
//! failures. A failed notification never aborts ingestion.

pub trait AdminNotifier: Send + Sync {
    /// Notify the administrators of a project. `body` is free text.
    fn notify_project_admins(&self, project_id: i64, subject: &str, body: &str);
}

/// Default notifier: records the notification in the service log.
/// Outbound email delivery lives behind this trait in deployments that
/// have a mail relay configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl AdminNotifier for LogNotifier {
    fn notify_project_admins(&self, project_id: i64, subject: &str, body: &str) {
        tracing::warn!(project_id, subject, "admin notification: {body}");
    }
}
