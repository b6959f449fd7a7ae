// sink.rs: destinations for finished records
use serde::Serialize;
use std::io::{self, BufWriter, Write};

use crate::error::SinkError;
use crate::record::Record;

/// Accepts completed records. `flush` is called once per input file, whether the file
/// parsed cleanly or not.
pub trait TelemetrySink {
    fn track(&mut self, record: Record) -> Result<(), SinkError>;
    fn flush(&mut self) -> Result<(), SinkError>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn track(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).track(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn track(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).track(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Human-readable output for dry runs.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetrySink for ConsoleSink<W> {
    fn track(&mut self, record: Record) -> Result<(), SinkError> {
        writeln!(
            self.out,
            "{} ({}): {}",
            record.timestamp.as_deref().unwrap_or("unknown"),
            record.severity,
            record.message
        )?;
        for (k, v) in &record.properties {
            writeln!(self.out, "\t{}: {}", k, v)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    record: &'a Record,
    #[serde(rename = "cloud_RoleName", skip_serializing_if = "Option::is_none")]
    role_name: Option<&'a str>,
    #[serde(rename = "cloud_RoleInstance", skip_serializing_if = "Option::is_none")]
    role_instance: Option<&'a str>,
}

/// One JSON object per record, newline separated.
pub struct NdjsonSink<W: Write> {
    out: BufWriter<W>,
    role_name: Option<String>,
    role_instance: Option<String>,
    written: u64,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: BufWriter::new(out), role_name: None, role_instance: None, written: 0 }
    }

    /// Tag every record with the run it belongs to.
    pub fn with_cloud_role(mut self, name: impl Into<String>, instance: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self.role_instance = Some(instance.into());
        self
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.out.into_inner().map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> TelemetrySink for NdjsonSink<W> {
    fn track(&mut self, record: Record) -> Result<(), SinkError> {
        let envelope = Envelope {
            record: &record,
            role_name: self.role_name.as_deref(),
            role_instance: self.role_instance.as_deref(),
        };
        serde_json::to_writer(&mut self.out, &envelope)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Record>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for MemorySink {
    fn track(&mut self, record: Record) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Properties, Severity};

    fn sample() -> Record {
        let mut properties = Properties::new();
        properties.insert("thread".into(), "main".into());
        properties.insert("line".into(), "3".into());
        Record {
            timestamp: Some("2023-01-10 11:30:23.701".into()),
            severity: Severity::Information,
            message: "# of open clients: 1".into(),
            properties,
        }
    }

    #[test]
    fn test_console_sink_format() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.track(sample()).unwrap();
        sink.track(Record::default()).unwrap();
        sink.flush().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "2023-01-10 11:30:23.701 (Information): # of open clients: 1\n\tthread: main\n\tline: 3\nunknown (Verbose): \n"
        );
    }

    #[test]
    fn test_ndjson_sink_writes_one_object_per_line() {
        let mut sink = NdjsonSink::new(Vec::new()).with_cloud_role("run", "42");
        sink.track(sample()).unwrap();
        sink.track(sample()).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.written(), 2);
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["severity"], "Information");
        assert_eq!(v["properties"]["thread"], "main");
        assert_eq!(v["cloud_RoleName"], "run");
        assert_eq!(v["cloud_RoleInstance"], "42");
    }

    #[test]
    fn test_ndjson_sink_without_role_omits_keys() {
        let mut sink = NdjsonSink::new(Vec::new());
        sink.track(Record::default()).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(!text.contains("cloud_RoleName"));
        assert!(text.contains("\"timestamp\":null"));
    }

    #[test]
    fn test_memory_sink_through_trait_object() {
        let mut memory = MemorySink::new();
        {
            let mut boxed: Box<dyn TelemetrySink + '_> = Box::new(&mut memory);
            boxed.track(sample()).unwrap();
            boxed.flush().unwrap();
        }
        assert_eq!(memory.records.len(), 1);
        assert_eq!(memory.flushes, 1);
    }
}
