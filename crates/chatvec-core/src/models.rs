//! Core data models that flow through the chatvec pipeline.
//!
//! Raw export lines become [`LineClass`]es, content lines become
//! [`NormalizedMessage`]s, and committed messages become
//! [`MetadataRecord`]s paired with a stored vector.

use serde::{Deserialize, Serialize};

/// A single line of an exported chat log, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Identifier of the originating source (e.g. the export's file name).
    pub source: String,
    /// 1-based line number within the source.
    pub line: usize,
    pub text: String,
}

impl RawLine {
    /// Split a whole source body into numbered raw lines.
    pub fn from_body(source: &str, body: &str) -> Vec<RawLine> {
        body.lines()
            .enumerate()
            .map(|(i, text)| RawLine {
                source: source.to_string(),
                line: i + 1,
                text: text.to_string(),
            })
            .collect()
    }
}

/// What a non-empty, trimmed line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Group-management chatter ("X added Y", "Z left the conversation").
    SystemMessage,
    /// A standalone date/time line, kept verbatim.
    Timestamp(String),
    /// Message text with URLs removed.
    Content(String),
}

/// A cleaned message ready to be embedded.
///
/// `text` is never empty and is either the content itself or
/// `"<timestamp> - <content>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub text: String,
    pub source: String,
    /// Line number of the content line the message came from.
    pub line: usize,
}

/// Metadata stored alongside each indexed vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: u64,
    pub text: String,
    pub source: String,
}

/// One ranked query result, resolved through the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub text: String,
    pub source: String,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}
