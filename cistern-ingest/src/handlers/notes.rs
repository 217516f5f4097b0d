//! Note file handler

use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;

#[derive(Debug)]
pub struct Note {
    pub name: String,
    pub time: Option<f64>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct NotesFacts {
    pub notes: Vec<Note>,
}

#[derive(Debug, Default)]
pub struct NotesHandler {
    core: HandlerCore,
    text: String,
    current_name: Option<String>,
    current_time: Option<f64>,
    current_text: Option<String>,
    facts: NotesFacts,
}

impl NotesHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, NotesFacts) {
        (self.core, self.facts)
    }
}

impl XmlHandler for NotesHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);
        self.text.clear();
        if name == "NOTE" {
            self.current_name = attributes.get("NAME").cloned();
            self.current_time = None;
            self.current_text = None;
        }
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        let text = std::mem::take(&mut self.text);
        match name {
            "TIME" => self.current_time = text.parse().ok(),
            "TEXT" => self.current_text = Some(text),
            "NOTE" => {
                if let Some(note_name) = self.current_name.take() {
                    self.facts.notes.push(Note {
                        name: note_name,
                        time: self.current_time.take(),
                        text: self.current_text.take().unwrap_or_default(),
                    });
                }
            }
            _ => {}
        }
        self.core.close(name);
        Ok(())
    }

    fn text(&mut self, data: &str) {
        self.text.push_str(data);
    }
}
