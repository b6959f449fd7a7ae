// multiline.rs: physical line reading and continuation joining for plaintext logs
use once_cell::sync::Lazy;
use regex::RegexSet;
use std::io::{self, BufRead};

// A line that starts with one of these begins a new record; anything else (stack
// frames, wrapped text) continues the previous one.
static RECORD_START: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"^\d{4}-\d{2}-\d{2}",
        r"^\d{4}/\d{2}/\d{2}",
        r"^\[\d{4}-\d{2}-\d{2}",
        r"^\[\d{4}/\d{2}/\d{2}",
    ])
    .unwrap()
});

pub fn starts_record(line: &str) -> bool {
    RECORD_START.is_match(line)
}

/// One logical record's text and the 1-based number of its first physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub line_number: u64,
    pub text: String,
}

/// Physical lines with `\n` / `\r\n` stripped. Invalid UTF-8 is replaced rather than
/// failing the file.
pub struct PhysicalLines<R> {
    reader: R,
    buf: Vec<u8>,
    count: u64,
}

impl<R: BufRead> PhysicalLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::with_capacity(256), count: 0 }
    }

    /// Number of physical lines read so far.
    pub fn lines_read(&self) -> u64 {
        self.count
    }
}

impl<R: BufRead> Iterator for PhysicalLines<R> {
    type Item = io::Result<LogicalLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                self.count += 1;
                let text = String::from_utf8_lossy(&self.buf).into_owned();
                Some(Ok(LogicalLine { line_number: self.count, text }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lazily groups physical lines into logical records. Finite and not restartable.
pub struct Continuations<R> {
    lines: PhysicalLines<R>,
    pending: Option<LogicalLine>,
    join: bool,
}

impl<R: BufRead> Continuations<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: PhysicalLines::new(reader), pending: None, join: true }
    }

    /// Every physical line is its own record.
    pub fn passthrough(reader: R) -> Self {
        Self { lines: PhysicalLines::new(reader), pending: None, join: false }
    }

    pub fn physical_lines(&self) -> u64 {
        self.lines.lines_read()
    }
}

impl<R: BufRead> Iterator for Continuations<R> {
    type Item = io::Result<LogicalLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.join {
            return self.lines.next();
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => match self.pending.take() {
                    None => self.pending = Some(line),
                    Some(done) if starts_record(&line.text) => {
                        self.pending = Some(line);
                        return Some(Ok(done));
                    }
                    Some(mut open) => {
                        open.text.push_str(&line.text);
                        self.pending = Some(open);
                    }
                },
                Some(Err(e)) => return Some(Err(e)),
                None => return self.pending.take().map(Ok),
            }
        }
    }
}

pub fn join_continuations<R: BufRead>(reader: R) -> Continuations<R> {
    Continuations::new(reader)
}
