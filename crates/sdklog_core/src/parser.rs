// parser.rs: per-line parsing for each input format and the per-file read loop
use indexmap::IndexMap;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::Level;

use crate::error::{JsonLineError, SdkLogError, SplitError};
use crate::extractor::{display_value, ExtractStrategy};
use crate::field::FieldKind;
use crate::layout::Layout;
use crate::multiline::{Continuations, PhysicalLines};
use crate::options::{InputFormat, JsonKeys, ParserOptions};
use crate::record::{MessageSource, Normalized, PartialRecord};
use crate::run::RunContext;
use crate::sink::TelemetrySink;
use crate::splitter::split_line;
use crate::tokenizer::{has_open_quote, split_csv};

/// Settings every per-line parse needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineContext {
    pub extraction: ExtractStrategy,
    /// Attach the unmodified line as `original-message`.
    pub keep_original: bool,
}

impl LineContext {
    /// Originals are kept in dry runs and whenever debug logging is on.
    pub fn new(extraction: ExtractStrategy, dry_run: bool) -> Self {
        Self { extraction, keep_original: dry_run || tracing::enabled!(Level::DEBUG) }
    }
}

impl Default for LineContext {
    fn default() -> Self {
        Self { extraction: ExtractStrategy::Json, keep_original: false }
    }
}

pub fn parse_plain_line(
    layout: &Layout,
    line: &str,
    line_number: u64,
    ctx: LineContext,
) -> Result<Normalized, SplitError> {
    let partial = split_line(layout, line, line_number)?;
    Ok(partial.normalize(line_number, ctx.keep_original.then_some(line), ctx.extraction))
}

/// Parse one JSON-lines record. The level and message keys are consumed; the
/// timestamp key becomes the record timestamp; logger and thread keys are renamed to
/// their canonical names; every other key is kept as a property.
pub fn parse_json_line(
    line: &str,
    line_number: u64,
    keys: &JsonKeys,
    ctx: LineContext,
) -> Result<Normalized, JsonLineError> {
    let mut object: IndexMap<String, Value> =
        serde_json::from_str(line).map_err(|source| JsonLineError { line_number, source })?;

    let mut partial = PartialRecord::new();
    partial.level = object.shift_remove(&keys.level).map(|v| display_value(&v));
    partial.timestamp = object.shift_remove(&keys.timestamp).map(|v| display_value(&v));
    partial.message = match object.shift_remove(&keys.message) {
        Some(v) => Some(MessageSource::Sdk(display_value(&v))),
        None => {
            tracing::warn!(line = line_number, key = %keys.message, "message key not found, using the whole line");
            Some(MessageSource::Verbatim(line.to_string()))
        }
    };

    // configured keys replace a raw `logger` or `thread` key of the same object
    for (key, canonical) in [(&keys.logger, FieldKind::Logger), (&keys.thread, FieldKind::Thread)] {
        if let Some(value) = object.shift_remove(key) {
            partial.set_property(canonical.as_str(), display_value(&value));
        }
    }
    for (key, value) in object.iter() {
        partial.set_property(key, display_value(value));
    }

    Ok(partial.normalize(line_number, ctx.keep_original.then_some(line), ctx.extraction))
}

/// Map already-split CSV columns positionally onto the layout's tokens.
pub fn parse_csv_fields(layout: &Layout, fields: &[String], line_number: u64, ctx: LineContext) -> Normalized {
    let tokens = layout.tokens();
    if fields.len() < tokens.len() {
        tracing::info!(
            line = line_number,
            columns = fields.len(),
            expected = tokens.len(),
            "CSV row has fewer columns than the layout"
        );
    }

    let mut partial = PartialRecord::new();
    for (token, value) in tokens.iter().zip(fields) {
        partial.assign(token, value.trim().to_string());
    }

    let original = ctx.keep_original.then(|| fields.join(","));
    partial.normalize(line_number, original.as_deref(), ctx.extraction)
}

pub fn parse_csv_line(layout: &Layout, line: &str, line_number: u64, ctx: LineContext) -> Normalized {
    parse_csv_fields(layout, &split_csv(line), line_number, ctx)
}

/// Outcome of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReport {
    pub records: u64,
    pub skipped: u64,
    pub extraction_failures: u64,
}

/// Drives one run: owns the options, the compiled layout and the run counters, and
/// feeds every record of every file to a sink.
pub struct LogParser {
    options: ParserOptions,
    layout: Layout,
    run: RunContext,
}

impl LogParser {
    pub fn new(options: ParserOptions) -> Self {
        let run = RunContext::from_options(&options);
        Self::with_run(options, run)
    }

    pub fn with_run(options: ParserOptions, run: RunContext) -> Self {
        let layout = options.compile_layout();
        tracing::debug!(layout = %layout, format = %options.format, "compiled layout");
        Self { options, layout, run }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub fn into_run(self) -> RunContext {
        self.run
    }

    fn line_context(&self) -> LineContext {
        LineContext::new(self.options.extraction, self.options.dry_run)
    }

    /// Open and parse one file. Failing to open it is fatal for that file only.
    pub fn parse_path<S>(&mut self, path: impl AsRef<Path>, sink: &mut S) -> Result<FileReport, SdkLogError>
    where
        S: TelemetrySink + ?Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SdkLogError::Open { path: path.display().to_string(), source: e })?;
        self.run.next_file(path.display().to_string());
        self.parse_reader(BufReader::new(file), sink)
    }

    /// Parse everything `reader` yields. The sink is flushed exactly once, also when
    /// reading or tracking fails partway through.
    pub fn parse_reader<R, S>(&mut self, reader: R, sink: &mut S) -> Result<FileReport, SdkLogError>
    where
        R: BufRead,
        S: TelemetrySink + ?Sized,
    {
        let result = self.read_records(reader, sink);
        let flushed = sink.flush();
        let report = result?;
        flushed?;
        Ok(report)
    }

    fn read_records<R, S>(&mut self, mut reader: R, sink: &mut S) -> Result<FileReport, SdkLogError>
    where
        R: BufRead,
        S: TelemetrySink + ?Sized,
    {
        let mut report = FileReport::default();
        if reader.fill_buf()?.is_empty() {
            tracing::warn!("file is empty, nothing to parse");
            return Ok(report);
        }

        let ctx = self.line_context();
        match self.options.format {
            InputFormat::Plain => {
                let mut lines = if self.options.join_multiline {
                    Continuations::new(reader)
                } else {
                    Continuations::passthrough(reader)
                };
                while self.run.should_keep_going() {
                    let Some(line) = lines.next() else { break };
                    let line = line?;
                    match parse_plain_line(&self.layout, &line.text, line.line_number, ctx) {
                        Ok(normalized) => self.emit(normalized, sink, &mut report)?,
                        Err(e) => {
                            tracing::error!(line = e.line_number, token = %e.token, "{}", e);
                            self.skip(&mut report);
                        }
                    }
                }
            }
            InputFormat::Json => {
                let mut lines = PhysicalLines::new(reader);
                while self.run.should_keep_going() {
                    let Some(line) = lines.next() else { break };
                    let line = line?;
                    if line.text.trim().is_empty() {
                        continue;
                    }
                    match parse_json_line(&line.text, line.line_number, &self.options.json, ctx) {
                        Ok(normalized) => self.emit(normalized, sink, &mut report)?,
                        Err(e) => {
                            tracing::info!(line = e.line_number, "{}", e);
                            self.skip(&mut report);
                        }
                    }
                }
            }
            InputFormat::Csv => {
                let mut lines = PhysicalLines::new(reader);
                while self.run.should_keep_going() {
                    let Some(line) = lines.next() else { break };
                    let line = line?;
                    let mut text = line.text;
                    // a quoted column may span physical lines
                    while has_open_quote(&text) {
                        match lines.next() {
                            Some(next) => {
                                text.push('\n');
                                text.push_str(&next?.text);
                            }
                            None => break,
                        }
                    }
                    if text.trim().is_empty() {
                        continue;
                    }
                    let normalized = parse_csv_line(&self.layout, &text, line.line_number, ctx);
                    self.emit(normalized, sink, &mut report)?;
                }
            }
        }

        tracing::debug!(
            records = report.records,
            skipped = report.skipped,
            extraction_failures = report.extraction_failures,
            "finished input"
        );
        Ok(report)
    }

    fn emit<S>(&mut self, normalized: Normalized, sink: &mut S, report: &mut FileReport) -> Result<(), SdkLogError>
    where
        S: TelemetrySink + ?Sized,
    {
        if normalized.extraction_error.is_some() {
            report.extraction_failures += 1;
            self.run.record_extraction_failure();
        }
        self.run.next_record(&normalized.record);
        sink.track(normalized.record)?;
        report.records += 1;
        Ok(())
    }

    fn skip(&mut self, report: &mut FileReport) {
        report.skipped += 1;
        self.run.record_skipped();
    }
}
