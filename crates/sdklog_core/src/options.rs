// options.rs: the configuration surface consumed by the parser, loadable from JSON
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::SdkLogError;
use crate::extractor::ExtractStrategy;
use crate::field::FieldKind;
use crate::layout::{Layout, DEFAULT_LAYOUT};

/// Records read per file in a dry run unless configured otherwise.
pub const DEFAULT_DRY_RUN_MAX_LINES: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Plain,
    Json,
    Csv,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Plain => "plain",
            InputFormat::Json => "json",
            InputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = SdkLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "plaintext" | "text" => Ok(InputFormat::Plain),
            "json" => Ok(InputFormat::Json),
            "csv" => Ok(InputFormat::Csv),
            other => Err(SdkLogError::UnknownFormat(other.to_string())),
        }
    }
}

/// Key names inside each JSON-lines object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonKeys {
    pub message: String,
    pub timestamp: String,
    pub logger: String,
    pub level: String,
    pub thread: String,
}

impl Default for JsonKeys {
    fn default() -> Self {
        Self {
            message: FieldKind::Message.as_str().to_string(),
            timestamp: FieldKind::Timestamp.as_str().to_string(),
            logger: FieldKind::Logger.as_str().to_string(),
            level: FieldKind::Level.as_str().to_string(),
            thread: FieldKind::Thread.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    pub format: InputFormat,
    /// Layout string for plaintext and CSV input.
    pub layout: String,
    pub json: JsonKeys,
    pub extraction: ExtractStrategy,
    pub join_multiline: bool,
    pub dry_run: bool,
    /// Only applies to dry runs; `None` means [`DEFAULT_DRY_RUN_MAX_LINES`].
    pub max_lines_per_file: Option<u64>,
    pub run_name: Option<String>,
    pub run_instance_id: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            format: InputFormat::Plain,
            layout: DEFAULT_LAYOUT.to_string(),
            json: JsonKeys::default(),
            extraction: ExtractStrategy::Json,
            join_multiline: true,
            dry_run: false,
            max_lines_per_file: None,
            run_name: None,
            run_instance_id: None,
        }
    }
}

impl ParserOptions {
    pub fn from_json_str(json: &str) -> Result<Self, SdkLogError> {
        serde_json::from_str(json).map_err(SdkLogError::Options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkLogError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| SdkLogError::Open { path: path.display().to_string(), source: e })?;
        Self::from_json_str(&data)
    }

    pub fn compile_layout(&self) -> Layout {
        Layout::compile(&self.layout)
    }

    /// Per-file record cap: bounded only in dry runs.
    pub fn effective_max_lines(&self) -> u64 {
        if self.dry_run {
            self.max_lines_per_file.unwrap_or(DEFAULT_DRY_RUN_MAX_LINES)
        } else {
            u64::MAX
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let opts = ParserOptions::default();
        assert_eq!(opts.format, InputFormat::Plain);
        assert_eq!(opts.layout, DEFAULT_LAYOUT);
        assert_eq!(opts.json.message, "message");
        assert_eq!(opts.json.level, "level");
        assert!(opts.join_multiline);
        assert_eq!(opts.effective_max_lines(), u64::MAX);
    }

    #[test]
    fn test_from_json_partial_document() {
        let opts = ParserOptions::from_json_str(
            r#"{ "format": "json", "dry_run": true, "json": { "timestamp": "datetime", "message": "msg" }, "extraction": "pattern" }"#,
        )
        .expect("options");
        assert_eq!(opts.format, InputFormat::Json);
        assert_eq!(opts.json.timestamp, "datetime");
        assert_eq!(opts.json.message, "msg");
        assert_eq!(opts.json.logger, "logger");
        assert_eq!(opts.extraction, ExtractStrategy::Pattern);
        assert_eq!(opts.effective_max_lines(), DEFAULT_DRY_RUN_MAX_LINES);
        assert_eq!(opts.layout, DEFAULT_LAYOUT);
    }

    #[test]
    fn test_from_json_rejects_unknown_format() {
        assert!(matches!(ParserOptions::from_json_str(r#"{ "format": "xml" }"#), Err(SdkLogError::Options(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "layout": "<timestamp> <level> ", "max_lines_per_file": 3, "dry_run": true }}"#).unwrap();
        let opts = ParserOptions::load(file.path()).unwrap();
        assert_eq!(opts.compile_layout().tokens().len(), 3);
        assert_eq!(opts.effective_max_lines(), 3);

        assert!(matches!(ParserOptions::load("/definitely/not/here.json"), Err(SdkLogError::Open { .. })));
    }

    #[test]
    fn test_input_format_from_str() {
        assert_eq!("PLAIN".parse::<InputFormat>().unwrap(), InputFormat::Plain);
        assert_eq!("csv".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert!("yaml".parse::<InputFormat>().is_err());
    }
}
