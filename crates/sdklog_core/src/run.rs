// run.rs: run-level bookkeeping shared across every file of one invocation
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::options::ParserOptions;
use crate::record::Record;

const MIN_TIMESTAMP_SENTINEL: &str = "2100-01-01T00:00:00";
const MAX_TIMESTAMP_SENTINEL: &str = "1970-01-01T00:00:00";

/// Counters and limits for one run. Updated between records only; the parsing core
/// reads nothing but the keep-going gate.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_name: String,
    unique_id: String,
    dry_run: bool,
    max_lines: u64,
    min_timestamp: String,
    max_timestamp: String,
    files: Vec<String>,
    lines_read: u64,
    lines_read_in_file: u64,
    skipped_lines: u64,
    extraction_failures: u64,
}

impl RunContext {
    pub fn new(run_name: impl Into<String>, dry_run: bool, max_lines: u64) -> Self {
        Self::with_unique_id(run_name, dry_run, max_lines, epoch_seconds())
    }

    pub fn with_unique_id(
        run_name: impl Into<String>,
        dry_run: bool,
        max_lines: u64,
        unique_id: impl Into<String>,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            unique_id: unique_id.into(),
            dry_run,
            max_lines,
            min_timestamp: MIN_TIMESTAMP_SENTINEL.to_string(),
            max_timestamp: MAX_TIMESTAMP_SENTINEL.to_string(),
            files: Vec::new(),
            lines_read: 0,
            lines_read_in_file: 0,
            skipped_lines: 0,
            extraction_failures: 0,
        }
    }

    pub fn from_options(options: &ParserOptions) -> Self {
        let name = options.run_name.clone().unwrap_or_else(|| "sdk-log-parser".to_string());
        match &options.run_instance_id {
            Some(id) => Self::with_unique_id(name, options.dry_run, options.effective_max_lines(), id.clone()),
            None => Self::new(name, options.dry_run, options.effective_max_lines()),
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn should_keep_going(&self) -> bool {
        self.lines_read_in_file < self.max_lines
    }

    pub fn next_file(&mut self, file_name: impl Into<String>) {
        let file_name = file_name.into();
        tracing::info!(file = %file_name, "reading file");
        self.lines_read_in_file = 0;
        self.files.push(file_name);
    }

    /// Count a tracked record and widen the observed timestamp range. Comparison is
    /// lexicographic, not calendar-aware.
    pub fn next_record(&mut self, record: &Record) {
        if let Some(ts) = record.timestamp.as_deref() {
            if ts < self.min_timestamp.as_str() {
                self.min_timestamp = ts.to_string();
            }
            if ts > self.max_timestamp.as_str() {
                self.max_timestamp = ts.to_string();
            }
        }
        self.lines_read += 1;
        self.lines_read_in_file += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped_lines += 1;
    }

    pub fn record_extraction_failure(&mut self) {
        self.extraction_failures += 1;
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn lines_read_in_file(&self) -> u64 {
        self.lines_read_in_file
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_name: self.run_name.clone(),
            unique_id: self.unique_id.clone(),
            files: self.files.len(),
            records: self.lines_read,
            skipped: self.skipped_lines,
            extraction_failures: self.extraction_failures,
            min_timestamp: self.min_timestamp.clone(),
            max_timestamp: self.max_timestamp.clone(),
        }
    }
}

fn epoch_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_name: String,
    pub unique_id: String,
    pub files: usize,
    pub records: u64,
    pub skipped: u64,
    pub extraction_failures: u64,
    pub min_timestamp: String,
    pub max_timestamp: String,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------")?;
        writeln!(
            f,
            "Parsed {} log records from {} file(s), min timestamp: '{}', max timestamp: '{}'",
            self.records, self.files, self.min_timestamp, self.max_timestamp
        )?;
        writeln!(f, "Skipped {} line(s); {} SDK message(s) could not be parsed", self.skipped, self.extraction_failures)?;
        writeln!(f, "Query all logs:")?;
        write!(
            f,
            "\ttraces | where cloud_RoleName == \"{}\" and cloud_RoleInstance == \"{}\"",
            self.run_name, self.unique_id
        )
    }
}
