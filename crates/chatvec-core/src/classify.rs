//! Raw line classification.
//!
//! [`LineClassifier::classify`] sorts a trimmed line into one of three
//! classes, checked in priority order:
//!
//! 1. **SystemMessage**: the line contains one of the configured
//!    group-management phrases (case-insensitive substring match).
//! 2. **Timestamp**: the line is recognized by the [`TimestampParser`].
//! 3. **Content**: everything else, with `scheme://…` URLs removed.
//!
//! Administrative text that happens to contain a date ("Alice added Bob
//! on 5 May 2024") is therefore never mistaken for a timestamp. Blank
//! lines, and content that is nothing but URLs, classify to `None`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::LineClass;
use crate::timestamp::{TimestampBounds, TimestampParser};

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://\S+").expect("url pattern compiles")
});

/// Group-management phrases from English chat exports.
pub const DEFAULT_SYSTEM_KEYWORDS: &[&str] = &[
    "added",
    "removed",
    "left the conversation",
    "left the group",
    "joined the group",
    "joined the conversation",
    "has renamed",
    "changed the group name",
    "changed the conversation name",
    "changed the group picture",
    "changed the conversation picture",
    "changed the topic",
];

/// Classifies raw chat-log lines.
///
/// Construct once per build and reuse; `classify` takes `&self` and is a
/// pure function of its input.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    /// Lowercased system-message phrases.
    keywords: Vec<String>,
    timestamps: TimestampParser,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_KEYWORDS, TimestampBounds::default())
    }
}

impl LineClassifier {
    /// Build a classifier from a keyword list and timestamp bounds.
    ///
    /// Blank keywords are dropped; an empty substring would match every
    /// line.
    pub fn new<S: AsRef<str>>(keywords: &[S], bounds: TimestampBounds) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keywords,
            timestamps: TimestampParser::new(bounds),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn timestamps(&self) -> &TimestampParser {
        &self.timestamps
    }

    /// Classify one raw line. Returns `None` when nothing is left to emit.
    pub fn classify(&self, line: &str) -> Option<LineClass> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.is_system_message(trimmed) {
            return Some(LineClass::SystemMessage);
        }

        if self.timestamps.recognizes(trimmed) {
            return Some(LineClass::Timestamp(trimmed.to_string()));
        }

        let content = strip_urls(trimmed);
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(LineClass::Content(content.to_string()))
    }

    fn is_system_message(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Remove every `scheme://non-whitespace` run from `text`.
pub fn strip_urls(text: &str) -> String {
    URL.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Option<LineClass> {
        LineClassifier::default().classify(line)
    }

    #[test]
    fn blank_lines_are_not_emitted() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   \t "), None);
    }

    #[test]
    fn system_message_beats_timestamp() {
        assert_eq!(
            classify("Alice added Bob to the group"),
            Some(LineClass::SystemMessage)
        );
        assert_eq!(classify("added Bob 5 May 2024"), Some(LineClass::SystemMessage));
        assert_eq!(
            classify("Carol LEFT THE CONVERSATION"),
            Some(LineClass::SystemMessage)
        );
    }

    #[test]
    fn timestamps_keep_the_trimmed_line() {
        assert_eq!(
            classify("  10:01  "),
            Some(LineClass::Timestamp("10:01".to_string()))
        );
        assert_eq!(
            classify("Monday, January 6, 2025"),
            Some(LineClass::Timestamp("Monday, January 6, 2025".to_string()))
        );
    }

    #[test]
    fn content_with_too_many_digits_stays_content() {
        let line = "my number is 555 0100 2233 ok";
        assert_eq!(classify(line), Some(LineClass::Content(line.to_string())));
    }

    #[test]
    fn urls_are_stripped_from_content() {
        assert_eq!(
            classify("look at this https://example.com/a?b=c"),
            Some(LineClass::Content("look at this".to_string()))
        );
        assert_eq!(
            classify("ftp://files.example.org/x and more"),
            Some(LineClass::Content("and more".to_string()))
        );
    }

    #[test]
    fn url_only_lines_are_dropped() {
        assert_eq!(classify("https://example.com/"), None);
        assert_eq!(classify(" http://a.b  https://c.d "), None);
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let c = LineClassifier::new(&["a rejoint le groupe", "  "], TimestampBounds::default());
        assert_eq!(c.keywords(), &["a rejoint le groupe".to_string()]);
        assert_eq!(
            c.classify("Marie a rejoint le groupe"),
            Some(LineClass::SystemMessage)
        );
        assert_eq!(
            c.classify("Alice added Bob"),
            Some(LineClass::Content("Alice added Bob".to_string()))
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let c = LineClassifier::default();
        for line in ["10:01", "hello", "Bob removed Eve", "see https://x.y"] {
            assert_eq!(c.classify(line), c.classify(line));
        }
    }
}
