// PyO3 bindings for sdklog_core
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule, PyString};
use std::fs::File;
use std::io::Cursor;

use sdklog_core as core;
use sdklog_core::{
    ExtractStrategy, InputFormat, JsonKeys, Layout, LineContext, LogParser, MemorySink, NdjsonSink,
    ParserOptions, Record, SdkLogError, DEFAULT_LAYOUT,
};

// Parallel iterators for batch parsing
use rayon::prelude::*;

fn to_py_err(e: SdkLogError) -> PyErr {
    match e {
        SdkLogError::Open { .. } | SdkLogError::Read(_) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn strategy(extraction: &str) -> PyResult<ExtractStrategy> {
    extraction.parse::<ExtractStrategy>().map_err(to_py_err)
}

fn record_to_dict<'py>(py: Python<'py>, record: &Record) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item(PyString::intern(py, "timestamp"), record.timestamp.as_deref())?;
    d.set_item(PyString::intern(py, "severity"), record.severity.as_str())?;
    d.set_item(PyString::intern(py, "message"), &record.message)?;
    let props = PyDict::new(py);
    for (k, v) in &record.properties {
        props.set_item(k, v)?;
    }
    d.set_item(PyString::intern(py, "properties"), props)?;
    Ok(d)
}

fn records_to_list(py: Python, records: &[Record]) -> PyResult<Vec<Py<PyDict>>> {
    records.iter().map(|r| record_to_dict(py, r).map(Bound::unbind)).collect()
}

fn options_for(format: &str, layout: Option<&str>, options_json: Option<&str>) -> PyResult<ParserOptions> {
    let mut options = match options_json {
        Some(json) => ParserOptions::from_json_str(json).map_err(to_py_err)?,
        None => ParserOptions::default(),
    };
    options.format = format.parse::<InputFormat>().map_err(to_py_err)?;
    if let Some(layout) = layout {
        options.layout = layout.to_string();
    }
    Ok(options)
}

/// Compile a layout string. Returns a list of (name, separator or None, kind) tuples,
/// where kind is a canonical field name or "custom".
#[pyfunction]
#[pyo3(text_signature = "(layout)")]
fn compile_layout(layout: &str) -> PyResult<Vec<(String, Option<String>, String)>> {
    let layout = Layout::compile(layout);
    Ok(layout
        .tokens()
        .iter()
        .map(|t| {
            let kind = t.field_kind().map(|k| k.as_str()).unwrap_or("custom");
            (t.name().to_string(), t.separator().map(str::to_string), kind.to_string())
        })
        .collect())
}

/// Parse one plaintext line. Returns a record dict, or None when the line does not
/// match the layout.
#[pyfunction]
#[pyo3(signature = (line, layout=None, line_number=1, dry_run=false, extraction="json"))]
fn parse_plain_line(
    py: Python,
    line: &str,
    layout: Option<&str>,
    line_number: u64,
    dry_run: bool,
    extraction: &str,
) -> PyResult<Option<Py<PyDict>>> {
    let layout = Layout::compile(layout.unwrap_or(DEFAULT_LAYOUT));
    let ctx = LineContext::new(strategy(extraction)?, dry_run);
    match core::parse_plain_line(&layout, line, line_number, ctx) {
        Ok(n) => Ok(Some(record_to_dict(py, &n.record)?.unbind())),
        Err(_) => Ok(None),
    }
}

/// Parse one JSON-lines record. Returns None when the line is not a JSON object.
#[pyfunction]
#[pyo3(signature = (
    line,
    line_number=1,
    message_key="message",
    timestamp_key="timestamp",
    logger_key="logger",
    level_key="level",
    thread_key="thread",
    dry_run=false,
    extraction="json"
))]
#[allow(clippy::too_many_arguments)]
fn parse_json_line(
    py: Python,
    line: &str,
    line_number: u64,
    message_key: &str,
    timestamp_key: &str,
    logger_key: &str,
    level_key: &str,
    thread_key: &str,
    dry_run: bool,
    extraction: &str,
) -> PyResult<Option<Py<PyDict>>> {
    let keys = JsonKeys {
        message: message_key.to_string(),
        timestamp: timestamp_key.to_string(),
        logger: logger_key.to_string(),
        level: level_key.to_string(),
        thread: thread_key.to_string(),
    };
    let ctx = LineContext::new(strategy(extraction)?, dry_run);
    match core::parse_json_line(line, line_number, &keys, ctx) {
        Ok(n) => Ok(Some(record_to_dict(py, &n.record)?.unbind())),
        Err(_) => Ok(None),
    }
}

/// Parse one CSV row, mapping columns positionally onto the layout's tokens.
#[pyfunction]
#[pyo3(signature = (line, layout=None, line_number=1))]
fn parse_csv_line(py: Python, line: &str, layout: Option<&str>, line_number: u64) -> PyResult<Py<PyDict>> {
    let layout = Layout::compile(layout.unwrap_or(DEFAULT_LAYOUT));
    let n = core::parse_csv_line(&layout, line, line_number, LineContext::default());
    Ok(record_to_dict(py, &n.record)?.unbind())
}

/// Extract SDK key/values from a message. Returns (display_message, properties).
/// Raises ValueError when JSON extraction fails.
#[pyfunction]
#[pyo3(signature = (message, extraction="json"))]
fn extract_sdk_message(py: Python, message: &str, extraction: &str) -> PyResult<(String, Py<PyDict>)> {
    let ex = strategy(extraction)?
        .extract(message)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let props = PyDict::new(py);
    for (k, v) in &ex.properties {
        props.set_item(k, v)?;
    }
    Ok((ex.display, props.unbind()))
}

/// Group text into logical records, appending lines that do not start with a date
/// to the record before them.
#[pyfunction]
#[pyo3(text_signature = "(text)")]
fn join_continuations(text: &str) -> PyResult<Vec<String>> {
    core::join_continuations(Cursor::new(text.as_bytes()))
        .map(|l| l.map(|l| l.text))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| PyIOError::new_err(e.to_string()))
}

/// Parse a whole file and return every record as a dict.
#[pyfunction]
#[pyo3(signature = (path, format="plain", layout=None, options_json=None))]
fn parse_file(
    py: Python,
    path: &str,
    format: &str,
    layout: Option<&str>,
    options_json: Option<&str>,
) -> PyResult<Vec<Py<PyDict>>> {
    let options = options_for(format, layout, options_json)?;
    let records = py
        .detach(|| {
            let mut parser = LogParser::new(options);
            let mut sink = MemorySink::new();
            parser.parse_path(path, &mut sink).map(|_| sink.records)
        })
        .map_err(to_py_err)?;
    records_to_list(py, &records)
}

/// Parse a file and write one JSON object per record to `output_path`. Returns the
/// number of records written.
#[pyfunction]
#[pyo3(signature = (input_path, output_path, format="plain", layout=None))]
fn parse_file_to_ndjson(
    py: Python,
    input_path: &str,
    output_path: &str,
    format: &str,
    layout: Option<&str>,
) -> PyResult<u64> {
    let options = options_for(format, layout, None)?;
    let outfile = File::create(output_path).map_err(|e| PyIOError::new_err(e.to_string()))?;
    py.detach(|| {
        let mut parser = LogParser::new(options);
        let run = parser.run();
        let mut sink = NdjsonSink::new(outfile).with_cloud_role(run.run_name(), run.unique_id());
        parser.parse_path(input_path, &mut sink).map(|report| report.records)
    })
    .map_err(to_py_err)
}

/// Parse a batch of plaintext lines in parallel. Returns one dict per line, or None
/// for lines that do not match the layout. Lines are numbered from 1 in list order.
#[pyfunction]
#[pyo3(signature = (lines, layout=None))]
fn parse_plain_lines_batch(
    py: Python,
    lines: Vec<String>,
    layout: Option<&str>,
) -> PyResult<Vec<Option<Py<PyDict>>>> {
    let layout = Layout::compile(layout.unwrap_or(DEFAULT_LAYOUT));
    let ctx = LineContext::default();

    // Perform heavy compute without interacting with Python; no need to hold the GIL here.
    let parsed: Vec<Option<Record>> = py.detach(|| {
        lines
            .par_iter()
            .enumerate()
            .map(|(i, line)| {
                core::parse_plain_line(&layout, line, i as u64 + 1, ctx)
                    .ok()
                    .map(|n| n.record)
            })
            .collect()
    });

    let mut out = Vec::with_capacity(parsed.len());
    for record in parsed {
        out.push(match record {
            Some(r) => Some(record_to_dict(py, &r)?.unbind()),
            None => None,
        });
    }
    Ok(out)
}

#[pymodule]
#[pyo3(module = "sdklog_rs")]
fn sdklog_rs(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "SDK log parsing library.\n\n\
        Features:\n\
        - Layout-driven plaintext parsing with multi-line joining\n\
        - JSON-lines and CSV input\n\
        - Extraction of SDK key/values embedded in log messages\n\n\
        Quick start:\n\
        >>> import sdklog_rs as sl\n\
        >>> r = sl.parse_plain_line('2023-01-10 11:30:23.701 INFO main c.a.Foo hello')\n\
        >>> print(r['severity'], r['properties'])",
    )?;

    // Layout and per-line parsing
    m.add_function(wrap_pyfunction!(compile_layout, m)?)?;
    m.add_function(wrap_pyfunction!(parse_plain_line, m)?)?;
    m.add_function(wrap_pyfunction!(parse_json_line, m)?)?;
    m.add_function(wrap_pyfunction!(parse_csv_line, m)?)?;
    m.add_function(wrap_pyfunction!(extract_sdk_message, m)?)?;
    m.add_function(wrap_pyfunction!(join_continuations, m)?)?;

    // Whole-file and batch APIs
    m.add_function(wrap_pyfunction!(parse_file, m)?)?;
    m.add_function(wrap_pyfunction!(parse_file_to_ndjson, m)?)?;
    m.add_function(wrap_pyfunction!(parse_plain_lines_batch, m)?)?;

    m.add("DEFAULT_LAYOUT", DEFAULT_LAYOUT)?;
    Ok(())
}
