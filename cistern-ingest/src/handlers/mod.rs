//! Handler state machines
//!
//! One handler per submission kind consumes the normalized parse event
//! stream and accumulates extracted facts. `Handler` is a closed enum;
//! dispatch is a match, not runtime class lookup.

pub mod build;
pub mod build_properties;
pub mod configure;
pub mod notes;
pub mod project;
pub mod reconcile;
pub mod testing;
pub mod update;

use crate::ingest::{IngestError, SubmissionKind};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Attributes of an element, with uppercased keys.
pub type AttrMap = HashMap<String, String>;

/// Capability set every handler implements.
///
/// Methods are async because the project-structure variant persists
/// state mid-parse; the in-memory variants simply never await.
#[allow(async_fn_in_trait)]
pub trait XmlHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError>;
    async fn end_element(&mut self, name: &str) -> Result<(), IngestError>;
    fn text(&mut self, data: &str);
}

/// State shared by all handlers: the element stack and the write-once
/// identifying facts harvested from the `SITE` and `SUBPROJECT`
/// elements.
#[derive(Debug, Default)]
pub struct HandlerCore {
    stack: Vec<String>,
    pub(crate) site_name: Option<String>,
    pub(crate) build_name: Option<String>,
    pub(crate) build_stamp: Option<String>,
    pub(crate) subproject_name: Option<String>,
}

impl HandlerCore {
    pub fn open(&mut self, name: &str, attributes: &AttrMap) {
        if name == "SITE" {
            if let Some(v) = attributes.get("NAME") {
                self.note_site_name(v);
            }
            if let Some(v) = attributes.get("BUILDNAME") {
                self.note_build_name(v);
            }
            if let Some(v) = attributes.get("BUILDSTAMP") {
                self.note_build_stamp(v);
            }
        } else if name == "SUBPROJECT" {
            if let Some(v) = attributes.get("NAME") {
                self.note_subproject_name(v);
            }
        }
        self.stack.push(name.to_string());
    }

    pub fn close(&mut self, _name: &str) {
        self.stack.pop();
    }

    /// Innermost open element, if any. O(1); the text callback uses it
    /// to decide what accumulated character data means.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    // The identifying facts freeze on first sighting. Some formats
    // carry them as SITE attributes, others as child-element text, so
    // handlers may also note them explicitly.

    pub fn note_site_name(&mut self, value: &str) {
        if self.site_name.is_none() {
            self.site_name = Some(value.to_string());
        }
    }

    pub fn note_build_name(&mut self, value: &str) {
        if self.build_name.is_none() {
            self.build_name = Some(value.to_string());
        }
    }

    pub fn note_build_stamp(&mut self, value: &str) {
        if self.build_stamp.is_none() {
            self.build_stamp = Some(value.to_string());
        }
    }

    pub fn note_subproject_name(&mut self, value: &str) {
        if self.subproject_name.is_none() {
            self.subproject_name = Some(value.to_string());
        }
    }

    pub fn site_name(&self) -> Option<&str> {
        self.site_name.as_deref()
    }

    pub fn build_name(&self) -> Option<&str> {
        self.build_name.as_deref()
    }

    pub fn build_stamp(&self) -> Option<&str> {
        self.build_stamp.as_deref()
    }

    pub fn subproject_name(&self) -> Option<&str> {
        self.subproject_name.as_deref()
    }
}

/// Kind-specific extracted facts.
#[derive(Debug)]
pub enum SubmissionFacts {
    Project(project::ProjectFacts),
    Build(build::BuildFacts),
    Configure(configure::ConfigureFacts),
    Test(testing::TestingFacts),
    Update(update::UpdateFacts),
    Notes(notes::NotesFacts),
    BuildProperties(serde_json::Value),
}

/// Terminal artifact of parsing: the extracted facts plus the backup
/// filename the original bytes will be archived under.
#[derive(Debug)]
pub struct HandlerResult {
    pub kind: SubmissionKind,
    pub site_name: Option<String>,
    pub build_name: Option<String>,
    pub build_stamp: Option<String>,
    pub subproject_name: Option<String>,
    pub facts: SubmissionFacts,
    /// Set by the orchestrator after parsing completes, never by the
    /// handler itself.
    pub backup_file_name: String,
}

impl HandlerResult {
    fn new(kind: SubmissionKind, core: HandlerCore, facts: SubmissionFacts) -> Self {
        Self {
            kind,
            site_name: core.site_name,
            build_name: core.build_name,
            build_stamp: core.build_stamp,
            subproject_name: core.subproject_name,
            facts,
            backup_file_name: String::new(),
        }
    }

    /// Result for a JSON-format submission, which carries no XML facts.
    pub fn from_json(kind: SubmissionKind, document: serde_json::Value) -> Self {
        Self::new(
            kind,
            HandlerCore::default(),
            SubmissionFacts::BuildProperties(document),
        )
    }
}

/// Closed variant type over the event-driven (XML) handlers.
#[derive(Debug)]
pub enum Handler {
    Project(project::ProjectHandler),
    Build(build::BuildHandler),
    Configure(configure::ConfigureHandler),
    Testing(testing::TestingHandler),
    Update(update::UpdateHandler),
    Notes(notes::NotesHandler),
}

impl Handler {
    /// Construct the handler for an XML submission kind. JSON kinds are
    /// not event-driven and return `None`.
    pub fn for_kind(
        kind: SubmissionKind,
        db: SqlitePool,
        project_id: i64,
        delete_old_subprojects: bool,
    ) -> Option<Handler> {
        match kind {
            SubmissionKind::Project => Some(Handler::Project(project::ProjectHandler::new(
                db,
                project_id,
                delete_old_subprojects,
            ))),
            SubmissionKind::Build => Some(Handler::Build(build::BuildHandler::new())),
            SubmissionKind::Configure => {
                Some(Handler::Configure(configure::ConfigureHandler::new()))
            }
            SubmissionKind::Test => Some(Handler::Testing(testing::TestingHandler::new())),
            SubmissionKind::Update => Some(Handler::Update(update::UpdateHandler::new())),
            SubmissionKind::Notes => Some(Handler::Notes(notes::NotesHandler::new())),
            SubmissionKind::BuildPropertiesJson => None,
        }
    }

    pub fn into_result(self) -> HandlerResult {
        match self {
            Handler::Project(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(SubmissionKind::Project, core, SubmissionFacts::Project(facts))
            }
            Handler::Build(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(SubmissionKind::Build, core, SubmissionFacts::Build(facts))
            }
            Handler::Configure(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(
                    SubmissionKind::Configure,
                    core,
                    SubmissionFacts::Configure(facts),
                )
            }
            Handler::Testing(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(SubmissionKind::Test, core, SubmissionFacts::Test(facts))
            }
            Handler::Update(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(SubmissionKind::Update, core, SubmissionFacts::Update(facts))
            }
            Handler::Notes(h) => {
                let (core, facts) = h.into_parts();
                HandlerResult::new(SubmissionKind::Notes, core, SubmissionFacts::Notes(facts))
            }
        }
    }
}

impl XmlHandler for Handler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        match self {
            Handler::Project(h) => h.start_element(name, attributes).await,
            Handler::Build(h) => h.start_element(name, attributes).await,
            Handler::Configure(h) => h.start_element(name, attributes).await,
            Handler::Testing(h) => h.start_element(name, attributes).await,
            Handler::Update(h) => h.start_element(name, attributes).await,
            Handler::Notes(h) => h.start_element(name, attributes).await,
        }
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        match self {
            Handler::Project(h) => h.end_element(name).await,
            Handler::Build(h) => h.end_element(name).await,
            Handler::Configure(h) => h.end_element(name).await,
            Handler::Testing(h) => h.end_element(name).await,
            Handler::Update(h) => h.end_element(name).await,
            Handler::Notes(h) => h.end_element(name).await,
        }
    }

    fn text(&mut self, data: &str) {
        match self {
            Handler::Project(h) => h.text(data),
            Handler::Build(h) => h.text(data),
            Handler::Configure(h) => h.text(data),
            Handler::Testing(h) => h.text(data),
            Handler::Update(h) => h.text(data),
            Handler::Notes(h) => h.text(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_facts_freeze_on_first_sighting() {
        let mut core = HandlerCore::default();
        let mut attrs = AttrMap::new();
        attrs.insert("NAME".to_string(), "dash1".to_string());
        attrs.insert("BUILDNAME".to_string(), "nightly".to_string());
        core.open("SITE", &attrs);

        assert_eq!(core.site_name(), Some("dash1"));
        assert_eq!(core.build_name(), Some("nightly"));
        assert_eq!(core.build_stamp(), None);

        let mut other = AttrMap::new();
        other.insert("NAME".to_string(), "dash2".to_string());
        core.open("SITE", &other);
        assert_eq!(core.site_name(), Some("dash1"));
    }

    #[test]
    fn element_stack_tracks_current() {
        let mut core = HandlerCore::default();
        let attrs = AttrMap::new();
        assert_eq!(core.current(), None);
        core.open("SITE", &attrs);
        core.open("BUILD", &attrs);
        assert_eq!(core.current(), Some("BUILD"));
        core.close("BUILD");
        assert_eq!(core.current(), Some("SITE"));
    }
}
