// error.rs: error types for per-line, per-file and sink failures
use std::io;
use thiserror::Error;

/// A plaintext line whose layout separator could not be located. Never fatal: the
/// driver logs it and moves on to the next line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("LINE {line_number}: can't find '{token}' in '{line}'")]
pub struct SplitError {
    pub line_number: u64,
    pub token: String,
    pub line: String,
}

/// The SDK message could not be read as a JSON object, even after skipping to the
/// first `{`. The raw text is still used as the record's message.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("SDK message is empty")]
    Empty,
    #[error("SDK message is not a JSON object: {0}")]
    NotJson(#[source] serde_json::Error),
}

/// A JSON-lines input line that is not a JSON object.
#[derive(Debug, Error)]
#[error("LINE {line_number}: unable to parse log line as a JSON object: {source}")]
pub struct JsonLineError {
    pub line_number: u64,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures that end processing of a whole file (or a whole run for options).
#[derive(Debug, Error)]
pub enum SdkLogError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read input: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse options: {0}")]
    Options(#[source] serde_json::Error),
    #[error("unknown input format: {0}")]
    UnknownFormat(String),
    #[error("unknown extraction strategy: {0}")]
    UnknownStrategy(String),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
