//! Build properties handler (JSON submissions)
//!
//! The only non-XML kind. The payload is a single JSON document, so
//! there is no event stream to feed; the whole buffer is parsed at
//! once.

use crate::ingest::{IngestError, ParseError};
use serde::de::Error as _;
use serde_json::Value;

/// Parse a build-properties submission. The document must be a JSON
/// object; anything else is malformed input.
pub fn parse_build_properties(bytes: &[u8]) -> Result<Value, IngestError> {
    let document: Value = serde_json::from_slice(bytes).map_err(ParseError::Json)?;
    if !document.is_object() {
        return Err(IngestError::Parse(ParseError::Json(serde_json::Error::custom(
            "build properties document must be a JSON object",
        ))));
    }
    Ok(document)
}
