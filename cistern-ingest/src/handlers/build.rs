//! Build output handler
//!
//! Accumulates compiler/linker diagnostics from a build submission.

use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// One ERROR or WARNING element from the build log.
#[derive(Debug)]
pub struct BuildDiagnostic {
    pub kind: DiagnosticKind,
    pub text: String,
    pub source_file: Option<String>,
    pub source_line: Option<i64>,
    pub log_line: Option<i64>,
}

impl BuildDiagnostic {
    fn new(kind: DiagnosticKind) -> Self {
        Self {
            kind,
            text: String::new(),
            source_file: None,
            source_line: None,
            log_line: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildFacts {
    pub command: Option<String>,
    pub diagnostics: Vec<BuildDiagnostic>,
    /// Build start/end, seconds since the epoch.
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl BuildFacts {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
            .count()
    }
}

#[derive(Debug, Default)]
pub struct BuildHandler {
    core: HandlerCore,
    text: String,
    current: Option<BuildDiagnostic>,
    facts: BuildFacts,
}

impl BuildHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, BuildFacts) {
        (self.core, self.facts)
    }
}

impl XmlHandler for BuildHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);
        self.text.clear();
        match name {
            "ERROR" => self.current = Some(BuildDiagnostic::new(DiagnosticKind::Error)),
            "WARNING" => self.current = Some(BuildDiagnostic::new(DiagnosticKind::Warning)),
            _ => {}
        }
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        let text = std::mem::take(&mut self.text);
        match name {
            "ERROR" | "WARNING" => {
                if let Some(diagnostic) = self.current.take() {
                    self.facts.diagnostics.push(diagnostic);
                }
            }
            "TEXT" => {
                if let Some(diagnostic) = &mut self.current {
                    diagnostic.text = text;
                }
            }
            "SOURCEFILE" => {
                if let Some(diagnostic) = &mut self.current {
                    diagnostic.source_file = Some(text);
                }
            }
            "SOURCELINENUMBER" => {
                if let Some(diagnostic) = &mut self.current {
                    diagnostic.source_line = text.parse().ok();
                }
            }
            "BUILDLOGLINE" => {
                if let Some(diagnostic) = &mut self.current {
                    diagnostic.log_line = text.parse().ok();
                }
            }
            "BUILDCOMMAND" => self.facts.command = Some(text),
            "STARTBUILDTIME" => self.facts.start_time = text.parse().ok(),
            "ENDBUILDTIME" => self.facts.end_time = text.parse().ok(),
            _ => {}
        }
        self.core.close(name);
        Ok(())
    }

    fn text(&mut self, data: &str) {
        self.text.push_str(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_buffer;

    const BUILD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Site BuildName="linux-gcc" BuildStamp="20260807-0100-Nightly" Name="dashbot">
  <Build>
    <StartBuildTime>1470000000</StartBuildTime>
    <BuildCommand>make -j8</BuildCommand>
    <Warning>
      <BuildLogLine>42</BuildLogLine>
      <Text>unused variable 'x'</Text>
      <SourceFile>src/widget.c</SourceFile>
      <SourceLineNumber>17</SourceLineNumber>
    </Warning>
    <Error>
      <BuildLogLine>97</BuildLogLine>
      <Text>undefined reference to `frobnicate'</Text>
      <SourceFile>src/frob.c</SourceFile>
      <SourceLineNumber>88</SourceLineNumber>
    </Error>
    <EndBuildTime>1470000123</EndBuildTime>
  </Build>
</Site>"#;

    #[tokio::test]
    async fn extracts_diagnostics_and_site_facts() {
        let mut handler = BuildHandler::new();
        parse_buffer(BUILD_XML.as_bytes(), &mut handler).await.unwrap();

        assert_eq!(handler.core.site_name(), Some("dashbot"));
        assert_eq!(handler.core.build_name(), Some("linux-gcc"));
        assert_eq!(handler.core.build_stamp(), Some("20260807-0100-Nightly"));

        let (_, facts) = handler.into_parts();
        assert_eq!(facts.error_count(), 1);
        assert_eq!(facts.warning_count(), 1);
        assert_eq!(facts.command.as_deref(), Some("make -j8"));
        assert_eq!(facts.start_time, Some(1_470_000_000));
        assert_eq!(facts.end_time, Some(1_470_000_123));

        let error = &facts.diagnostics[1];
        assert_eq!(error.kind, DiagnosticKind::Error);
        assert_eq!(error.source_file.as_deref(), Some("src/frob.c"));
        assert_eq!(error.source_line, Some(88));
        assert_eq!(error.log_line, Some(97));
    }
}
