//! Submission type classification
//!
//! Two paths resolve a submission to a handler: the declared kind of a
//! pre-registered record, or a content sniff of the first chunk of the
//! stream. Kinds are a closed enum; adding a kind means adding a
//! variant and its match arms, not registering a discoverable class.

use serde::Serialize;
use std::fmt;

/// Payload encoding of a submission kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xml,
    Json,
}

/// The supported submission kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubmissionKind {
    /// Project structure declaration (sub-projects + dependencies)
    Project,
    /// Compiler/linker output
    Build,
    /// Configure step output
    Configure,
    /// Test results
    Test,
    /// Version-control update summary
    Update,
    /// Free-form note files
    Notes,
    /// Build properties as a JSON document
    BuildPropertiesJson,
}

impl SubmissionKind {
    pub fn format(self) -> Format {
        match self {
            SubmissionKind::BuildPropertiesJson => Format::Json,
            _ => Format::Xml,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionKind::Project => "Project",
            SubmissionKind::Build => "Build",
            SubmissionKind::Configure => "Configure",
            SubmissionKind::Test => "Test",
            SubmissionKind::Update => "Update",
            SubmissionKind::Notes => "Notes",
            SubmissionKind::BuildPropertiesJson => "BuildPropertiesJSON",
        }
    }

    /// The canonical original filename for this kind, used when the
    /// submission arrived as an anonymous stream.
    pub fn original_filename(self) -> String {
        match self.format() {
            Format::Xml => format!("{}.xml", self.as_str()),
            Format::Json => format!("{}.json", self.as_str()),
        }
    }

    /// Resolve a pre-registered record's declared kind against the
    /// allow-list of implemented kinds.
    ///
    /// Returns `None` for anything else - including kind names that
    /// other servers support but this one has no handler for. The
    /// caller treats that as a non-fatal "drop the submission".
    pub fn from_declared(kind: &str) -> Option<Self> {
        match kind {
            "Project" => Some(SubmissionKind::Project),
            "Build" => Some(SubmissionKind::Build),
            "Configure" => Some(SubmissionKind::Configure),
            "Test" => Some(SubmissionKind::Test),
            "Update" => Some(SubmissionKind::Update),
            "Notes" => Some(SubmissionKind::Notes),
            "BuildPropertiesJSON" => Some(SubmissionKind::BuildPropertiesJson),
            _ => None,
        }
    }

    /// Infer the kind from the first chunk of an anonymous stream.
    ///
    /// Matching is case-insensitive over element markers. `<Update` must
    /// be tried before `<Build` because update documents contain a
    /// `<BuildName>` child element.
    pub fn sniff(prefix: &[u8]) -> Option<Self> {
        let haystack = String::from_utf8_lossy(prefix).to_ascii_lowercase();
        const RULES: [(&str, SubmissionKind); 6] = [
            ("<update", SubmissionKind::Update),
            ("<testing", SubmissionKind::Test),
            ("<configure", SubmissionKind::Configure),
            ("<notes", SubmissionKind::Notes),
            ("<project", SubmissionKind::Project),
            ("<build", SubmissionKind::Build),
        ];
        RULES
            .iter()
            .find(|(marker, _)| haystack.contains(marker))
            .map(|&(_, kind)| kind)
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_each_xml_kind() {
        let cases = [
            (
                br#"<?xml version="1.0"?><Site Name="s"><Build></Build></Site>"#.as_slice(),
                SubmissionKind::Build,
            ),
            (
                br#"<?xml version="1.0"?><Site><Configure></Configure></Site>"#.as_slice(),
                SubmissionKind::Configure,
            ),
            (
                br#"<?xml version="1.0"?><Site><Testing></Testing></Site>"#.as_slice(),
                SubmissionKind::Test,
            ),
            (
                br#"<?xml version="1.0"?><Update mode="Client"><BuildName>n</BuildName></Update>"#
                    .as_slice(),
                SubmissionKind::Update,
            ),
            (
                br#"<?xml version="1.0"?><Site><Notes><Note/></Notes></Site>"#.as_slice(),
                SubmissionKind::Notes,
            ),
            (
                br#"<?xml version="1.0"?><Project name="VTK"></Project>"#.as_slice(),
                SubmissionKind::Project,
            ),
        ];
        for (content, expected) in cases {
            assert_eq!(SubmissionKind::sniff(content), Some(expected));
        }
    }

    #[test]
    fn update_wins_over_its_buildname_child() {
        let content = br#"<Update><Site>s</Site><BuildName>nightly</BuildName></Update>"#;
        assert_eq!(SubmissionKind::sniff(content), Some(SubmissionKind::Update));
    }

    #[test]
    fn unknown_content_does_not_classify() {
        assert_eq!(SubmissionKind::sniff(b"{\"not\": \"xml\"}"), None);
        assert_eq!(SubmissionKind::sniff(b""), None);
        assert_eq!(SubmissionKind::sniff(b"<html><body>hi</body></html>"), None);
    }

    #[test]
    fn declared_kinds_outside_the_allow_list_resolve_to_none() {
        assert_eq!(SubmissionKind::from_declared("GcovTar"), None);
        assert_eq!(SubmissionKind::from_declared("JavaJSONTar"), None);
        assert_eq!(SubmissionKind::from_declared("nonsense"), None);
        assert_eq!(
            SubmissionKind::from_declared("BuildPropertiesJSON"),
            Some(SubmissionKind::BuildPropertiesJson)
        );
        assert_eq!(
            SubmissionKind::from_declared("Project"),
            Some(SubmissionKind::Project)
        );
    }
}
