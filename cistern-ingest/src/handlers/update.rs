//! Version-control update handler
//!
//! Update documents carry the site/build identity as child-element
//! text rather than SITE attributes, so this handler feeds those into
//! the shared core explicitly.

use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Updated,
    Modified,
    Conflicting,
}

/// One changed file reported by the update step.
#[derive(Debug)]
pub struct UpdateEntry {
    pub status: ChangeStatus,
    pub file: Option<String>,
    pub directory: Option<String>,
    pub author: Option<String>,
    pub revision: Option<String>,
    pub log: Option<String>,
}

impl UpdateEntry {
    fn new(status: ChangeStatus) -> Self {
        Self {
            status,
            file: None,
            directory: None,
            author: None,
            revision: None,
            log: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct UpdateFacts {
    pub update_type: Option<String>,
    pub command: Option<String>,
    pub return_status: Option<String>,
    pub entries: Vec<UpdateEntry>,
}

#[derive(Debug, Default)]
pub struct UpdateHandler {
    core: HandlerCore,
    text: String,
    current: Option<UpdateEntry>,
    facts: UpdateFacts,
}

impl UpdateHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, UpdateFacts) {
        (self.core, self.facts)
    }
}

impl XmlHandler for UpdateHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);
        self.text.clear();
        match name {
            "UPDATED" => self.current = Some(UpdateEntry::new(ChangeStatus::Updated)),
            "MODIFIED" => self.current = Some(UpdateEntry::new(ChangeStatus::Modified)),
            "CONFLICTING" => self.current = Some(UpdateEntry::new(ChangeStatus::Conflicting)),
            _ => {}
        }
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        let text = std::mem::take(&mut self.text);
        match name {
            "UPDATED" | "MODIFIED" | "CONFLICTING" => {
                if let Some(entry) = self.current.take() {
                    self.facts.entries.push(entry);
                }
            }
            "FILE" => {
                if let Some(entry) = &mut self.current {
                    entry.file = Some(text);
                }
            }
            "DIRECTORY" => {
                if let Some(entry) = &mut self.current {
                    entry.directory = Some(text);
                }
            }
            "AUTHOR" => {
                if let Some(entry) = &mut self.current {
                    entry.author = Some(text);
                }
            }
            "REVISION" => {
                if let Some(entry) = &mut self.current {
                    entry.revision = Some(text);
                }
            }
            "LOG" => {
                if let Some(entry) = &mut self.current {
                    entry.log = Some(text);
                }
            }
            // Identity arrives as element text in this format.
            "SITE" => self.core.note_site_name(&text),
            "BUILDNAME" => self.core.note_build_name(&text),
            "BUILDSTAMP" => self.core.note_build_stamp(&text),
            "UPDATETYPE" => self.facts.update_type = Some(text),
            "UPDATECOMMAND" => self.facts.command = Some(text),
            "UPDATERETURNSTATUS" => self.facts.return_status = Some(text),
            _ => {}
        }
        self.core.close(name);
        Ok(())
    }

    fn text(&mut self, data: &str) {
        self.text.push_str(data);
    }
}
