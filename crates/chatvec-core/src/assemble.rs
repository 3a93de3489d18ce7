//! Message reconstruction from classified lines.
//!
//! [`MessageAssembler`] is a two-state machine (no pending timestamp /
//! pending timestamp) scoped to one source:
//!
//! | Input | Effect |
//! |-------|--------|
//! | `SystemMessage` | nothing |
//! | `Timestamp(t)` | pending = `t`, replacing any earlier pending value |
//! | `Content(c)` | emit `"t - c"` if pending (then clear), else emit `c` |
//!
//! A timestamp still pending when the source ends is dropped.
//! [`assemble_source`] wires a [`LineClassifier`] and an assembler into a
//! lazy iterator over one source's lines.

use crate::classify::LineClassifier;
use crate::models::{LineClass, NormalizedMessage, RawLine};

/// Separator between an attached timestamp and the message text.
pub const TIMESTAMP_SEPARATOR: &str = " - ";

/// Attaches timestamps to the content line that follows them.
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    source: String,
    pending_timestamp: Option<String>,
}

impl MessageAssembler {
    /// Start assembling a new source with no pending timestamp.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pending_timestamp: None,
        }
    }

    /// Feed one classified line; returns the message it completes, if any.
    pub fn push(&mut self, class: LineClass, line: usize) -> Option<NormalizedMessage> {
        match class {
            LineClass::SystemMessage => None,
            LineClass::Timestamp(t) => {
                self.pending_timestamp = Some(t);
                None
            }
            LineClass::Content(c) => {
                let text = match self.pending_timestamp.take() {
                    Some(t) => format!("{t}{TIMESTAMP_SEPARATOR}{c}"),
                    None => c,
                };
                Some(NormalizedMessage {
                    text,
                    source: self.source.clone(),
                    line,
                })
            }
        }
    }

    /// End the source. Returns the dangling timestamp that was dropped.
    pub fn finish(mut self) -> Option<String> {
        self.pending_timestamp.take()
    }
}

/// Lazy iterator of messages for one source.
pub struct SourceMessages<'c, I> {
    classifier: &'c LineClassifier,
    lines: I,
    assembler: MessageAssembler,
}

impl<I> Iterator for SourceMessages<'_, I>
where
    I: Iterator<Item = RawLine>,
{
    type Item = NormalizedMessage;

    fn next(&mut self) -> Option<NormalizedMessage> {
        for raw in self.lines.by_ref() {
            let Some(class) = self.classifier.classify(&raw.text) else {
                continue;
            };
            if let Some(msg) = self.assembler.push(class, raw.line) {
                return Some(msg);
            }
        }
        None
    }
}

/// Classify and assemble the lines of a single source.
///
/// Assembler state starts fresh, so a timestamp at the end of one source
/// never leaks into the next.
pub fn assemble_source<'c, I>(
    classifier: &'c LineClassifier,
    source: &str,
    lines: I,
) -> SourceMessages<'c, I::IntoIter>
where
    I: IntoIterator<Item = RawLine>,
{
    SourceMessages {
        classifier,
        lines: lines.into_iter(),
        assembler: MessageAssembler::new(source),
    }
}
