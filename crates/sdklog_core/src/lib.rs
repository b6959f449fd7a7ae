// sdklog_core: pure Rust library for layout-driven SDK log parsing, SDK message extraction and record normalization.
pub mod error;
pub mod extractor;
pub mod field;
pub mod layout;
pub mod multiline;
pub mod options;
pub mod parser;
pub mod record;
pub mod run;
pub mod sink;
pub mod splitter;
pub mod tokenizer;

pub use error::{ExtractError, JsonLineError, SdkLogError, SinkError, SplitError};
pub use extractor::{extract_json, extract_pattern, ExtractStrategy, Extraction};
pub use field::FieldKind;
pub use layout::{Layout, Token, TokenKind, DEFAULT_LAYOUT};
pub use multiline::{join_continuations, Continuations, LogicalLine, PhysicalLines};
pub use options::{InputFormat, JsonKeys, ParserOptions};
pub use parser::{parse_csv_line, parse_json_line, parse_plain_line, FileReport, LineContext, LogParser};
pub use record::{Normalized, PartialRecord, Properties, Record, Severity, ORIGINAL_MESSAGE_KEY};
pub use run::{RunContext, RunSummary};
pub use sink::{ConsoleSink, MemorySink, NdjsonSink, TelemetrySink};
pub use splitter::split_line;
pub use tokenizer::split_csv;
