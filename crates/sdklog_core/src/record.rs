// record.rs: the normalized output record and the per-line builder that produces it
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::error::ExtractError;
use crate::extractor::ExtractStrategy;
use crate::field::FieldKind;
use crate::layout::{Token, TokenKind};

/// Ordered, unique-keyed record properties.
pub type Properties = IndexMap<String, String>;

/// Property holding the unmodified input line in dry runs and debug runs.
pub const ORIGINAL_MESSAGE_KEY: &str = "original-message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum Severity {
    #[default]
    Verbose,
    Information,
    Warning,
    Error,
}

impl Severity {
    /// Exact, case-sensitive mapping; anything unrecognized is `Verbose`.
    pub fn from_level(level: Option<&str>) -> Severity {
        match level {
            Some("INFO") => Severity::Information,
            Some("WARN") => Severity::Warning,
            Some("ERROR") => Severity::Error,
            _ => Severity::Verbose,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Verbose => "Verbose",
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized log record, handed to a sink once complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Record {
    pub timestamp: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub properties: Properties,
}

/// What the message field holds once the line has been split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSource {
    /// SDK text to run through the extractor.
    Sdk(String),
    /// Text used as-is, e.g. a whole JSON line that had no message key.
    Verbatim(String),
}

/// Field values collected while walking one line, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub date: Option<String>,
    pub time: Option<String>,
    pub timestamp: Option<String>,
    pub level: Option<String>,
    pub message: Option<MessageSource>,
    pub properties: Properties,
}

/// A finished record plus the extraction failure, if any, behind its message.
#[derive(Debug)]
pub struct Normalized {
    pub record: Record,
    pub extraction_error: Option<ExtractError>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one token value to its accumulator or, for everything else, to the
    /// property map. Properties are first-write-wins.
    pub fn assign(&mut self, token: &Token, value: String) {
        match token.kind() {
            TokenKind::Known(FieldKind::Date) => self.date = Some(value),
            TokenKind::Known(FieldKind::Time) => self.time = Some(value),
            TokenKind::Known(FieldKind::Timestamp) => self.timestamp = Some(value),
            TokenKind::Known(FieldKind::Level) => self.level = Some(value),
            TokenKind::Known(FieldKind::Message) => self.message = Some(MessageSource::Sdk(value)),
            TokenKind::Known(kind @ (FieldKind::Logger | FieldKind::Thread | FieldKind::Line)) => {
                self.set_property(kind.as_str(), value)
            }
            TokenKind::Custom => self.set_property(token.name().trim(), value),
        }
    }

    pub fn set_property(&mut self, key: &str, value: String) {
        self.properties.entry(key.to_string()).or_insert(value);
    }

    fn synthesize_timestamp(&mut self) -> Option<String> {
        if let Some(ts) = self.timestamp.take() {
            return Some(ts);
        }
        match (self.date.take(), self.time.take()) {
            (Some(d), Some(t)) => Some(format!("{} {}", d, t)),
            (Some(d), None) => Some(d),
            (None, Some(t)) => Some(t),
            (None, None) => None,
        }
    }

    /// Finish the record: severity, timestamp, line tag, optional original line, then
    /// SDK message extraction merged without clobbering keys already present.
    pub fn normalize(
        mut self,
        line_number: u64,
        original_line: Option<&str>,
        extraction: ExtractStrategy,
    ) -> Normalized {
        let severity = Severity::from_level(self.level.as_deref());
        let timestamp = self.synthesize_timestamp();
        let mut properties = std::mem::take(&mut self.properties);

        if let Some(line) = original_line {
            properties.insert(ORIGINAL_MESSAGE_KEY.to_string(), line.to_string());
        }
        properties.insert(FieldKind::Line.as_str().to_string(), line_number.to_string());

        let mut extraction_error = None;
        let message = match self.message.take() {
            Some(MessageSource::Verbatim(text)) => text,
            Some(MessageSource::Sdk(text)) => match extraction.extract(&text) {
                Ok(ex) => {
                    for (k, v) in ex.properties {
                        properties.entry(k).or_insert(v);
                    }
                    ex.display
                }
                Err(e) => {
                    tracing::debug!(line = line_number, error = %e, sdk_message = %text, "could not parse SDK message");
                    extraction_error = Some(e);
                    text
                }
            },
            None => String::new(),
        };

        Normalized {
            record: Record { timestamp, severity, message, properties },
            extraction_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping_is_total() {
        assert_eq!(Severity::from_level(Some("INFO")), Severity::Information);
        assert_eq!(Severity::from_level(Some("WARN")), Severity::Warning);
        assert_eq!(Severity::from_level(Some("ERROR")), Severity::Error);
        for other in ["DEBUG", "", "info", "TRACE", "WARNING", " INFO"] {
            assert_eq!(Severity::from_level(Some(other)), Severity::Verbose, "level {:?}", other);
        }
        assert_eq!(Severity::from_level(None), Severity::Verbose);
    }

    #[test]
    fn test_timestamp_synthesis() {
        let mut p = PartialRecord::new();
        p.date = Some("2023-01-10".into());
        p.time = Some("11:30:23.701".into());
        assert_eq!(p.normalize(1, None, ExtractStrategy::Json).record.timestamp.as_deref(), Some("2023-01-10 11:30:23.701"));

        let mut p = PartialRecord::new();
        p.time = Some("11:30:23".into());
        assert_eq!(p.normalize(1, None, ExtractStrategy::Json).record.timestamp.as_deref(), Some("11:30:23"));

        let mut p = PartialRecord::new();
        p.timestamp = Some("2021-10-01 06:31:57,637".into());
        p.date = Some("ignored".into());
        assert_eq!(p.normalize(1, None, ExtractStrategy::Json).record.timestamp.as_deref(), Some("2021-10-01 06:31:57,637"));

        assert_eq!(PartialRecord::new().normalize(1, None, ExtractStrategy::Json).record.timestamp, None);
    }

    #[test]
    fn test_assign_routes_known_and_custom_fields() {
        let mut p = PartialRecord::new();
        p.assign(&Token::new("Thread", None), "main".into());
        p.assign(&Token::new("class", None), "c.a.Foo".into());
        p.assign(&Token::new("class", None), "c.a.Bar".into());
        p.assign(&Token::new("LEVEL", None), "WARN".into());
        assert_eq!(p.properties["thread"], "main");
        assert_eq!(p.properties["class"], "c.a.Foo");
        assert_eq!(p.level.as_deref(), Some("WARN"));
    }

    #[test]
    fn test_normalize_keeps_splitter_values_over_extracted_ones() {
        let mut p = PartialRecord::new();
        p.set_property("hostName", "from-layout".into());
        p.message = Some(MessageSource::Sdk(r#"{"hostName":"from-sdk","az.sdk.message":"hi","extra":1}"#.into()));
        let n = p.normalize(7, Some("raw line"), ExtractStrategy::Json);
        assert!(n.extraction_error.is_none());
        assert_eq!(n.record.message, "hi");
        assert_eq!(n.record.properties["hostName"], "from-layout");
        assert_eq!(n.record.properties["extra"], "1");
        assert_eq!(n.record.properties["line"], "7");
        assert_eq!(n.record.properties[ORIGINAL_MESSAGE_KEY], "raw line");
    }

    #[test]
    fn test_normalize_reports_extraction_failure_and_keeps_text() {
        let mut p = PartialRecord::new();
        p.message = Some(MessageSource::Sdk("# of open clients: 1".into()));
        let n = p.normalize(3, None, ExtractStrategy::Json);
        assert!(n.extraction_error.is_some());
        assert_eq!(n.record.message, "# of open clients: 1");
        assert!(!n.record.properties.contains_key(ORIGINAL_MESSAGE_KEY));
        assert_eq!(n.record.properties.len(), 1);
    }

    #[test]
    fn test_verbatim_message_skips_extraction() {
        let mut p = PartialRecord::new();
        p.message = Some(MessageSource::Verbatim("{\"a\":1}".into()));
        let n = p.normalize(1, None, ExtractStrategy::Json);
        assert_eq!(n.record.message, "{\"a\":1}");
        assert!(!n.record.properties.contains_key("a"));
    }
}
