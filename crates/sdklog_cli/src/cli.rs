// cli.rs: command-line surface of sdk-log-parser
use clap::{ArgAction, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;

use sdklog_core::{ExtractStrategy, FieldKind, InputFormat, ParserOptions};

pub const CONNECTION_STRING_ENV: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";

const EXAMPLES: &str = "\
--------- EXAMPLES ---------

Example 1 (custom layout):
  sdk-log-parser plain -f ./logs.zip -l \"<date> <time> <level> [<thread>] <class> - \" -o records.ndjson -c \"InstrumentationKey=...\"
Example 2 (default layout, dry run printing the first 10 records of each file):
  sdk-log-parser plain -f ./logs/app.log -d
Example 3 (JSON lines with custom keys):
  sdk-log-parser json -f ./my-json.log --message-key msg --timestamp-key datetime -d
";

#[derive(Parser, Debug)]
#[command(name = "sdk-log-parser")]
#[command(about = "Parse SDK log files into normalized telemetry records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plaintext logs split by a layout
    Plain {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// One JSON object per line
    Json {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        keys: JsonKeyArgs,
    },
    /// Comma-separated columns mapped onto a layout
    Csv {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Log file, a directory searched recursively for *.log files, or a zip archive
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Unzip --file before processing (implied by a .zip extension)
    #[arg(short = 'z', long)]
    pub unzip: bool,

    /// Layout of each line, e.g. "<date> <time> <level> <thread> <class> "
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Print records instead of exporting them
    #[arg(short, long)]
    pub dry_run: bool,

    /// Name for this run; defaults to the file or directory name
    #[arg(short, long = "run-id")]
    pub run_id: Option<String>,

    /// Connection string for the telemetry backend; without it the run is a dry run
    #[arg(short, long)]
    pub connection_string: Option<String>,

    /// Records per file in a dry run
    #[arg(short, long)]
    pub max_lines_per_file: Option<u64>,

    /// JSON options file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// How to read key/values out of SDK messages: json or pattern
    #[arg(long)]
    pub extract: Option<ExtractStrategy>,

    /// Treat every physical line as a record
    #[arg(long)]
    pub no_join: bool,

    /// Write NDJSON records here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone, Default)]
pub struct JsonKeyArgs {
    /// Key holding the log message
    #[arg(long)]
    pub message_key: Option<String>,
    /// Key holding the timestamp
    #[arg(long)]
    pub timestamp_key: Option<String>,
    /// Key holding the logger name
    #[arg(long)]
    pub logger_key: Option<String>,
    /// Key holding the log level
    #[arg(long)]
    pub level_key: Option<String>,
    /// Key holding the thread name
    #[arg(long)]
    pub thread_key: Option<String>,
}

impl Command {
    pub fn format(&self) -> InputFormat {
        match self {
            Command::Plain { .. } => InputFormat::Plain,
            Command::Json { .. } => InputFormat::Json,
            Command::Csv { .. } => InputFormat::Csv,
        }
    }

    pub fn common(&self) -> &CommonArgs {
        match self {
            Command::Plain { common } | Command::Json { common, .. } | Command::Csv { common } => common,
        }
    }

    /// Layer the flags over `options`.
    pub fn apply(&self, options: &mut ParserOptions) {
        let common = self.common();
        options.format = self.format();
        if let Some(layout) = &common.layout {
            options.layout = layout.clone();
        }
        if let Some(extract) = common.extract {
            options.extraction = extract;
        }
        if common.dry_run {
            options.dry_run = true;
        }
        if common.no_join {
            options.join_multiline = false;
        }
        if common.max_lines_per_file.is_some() {
            options.max_lines_per_file = common.max_lines_per_file;
        }
        if common.run_id.is_some() {
            options.run_name = common.run_id.clone();
        }
        if let Command::Json { keys, .. } = self {
            let targets = [
                (&keys.message_key, &mut options.json.message),
                (&keys.timestamp_key, &mut options.json.timestamp),
                (&keys.logger_key, &mut options.json.logger),
                (&keys.level_key, &mut options.json.level),
                (&keys.thread_key, &mut options.json.thread),
            ];
            for (flag, target) in targets {
                if let Some(value) = flag {
                    *target = value.clone();
                }
            }
        }
    }
}

fn help_footer() -> String {
    format!("{}\n{}", FieldKind::describe_all(), EXAMPLES)
}

/// Parse the process arguments, with the known-parameters table and examples appended
/// to every help screen.
pub fn parse() -> Cli {
    let footer = help_footer();
    let mut command = Cli::command().after_help(footer.clone());
    for name in ["plain", "json", "csv"] {
        let footer = footer.clone();
        command = command.mut_subcommand(name, move |sub| sub.after_help(footer));
    }
    let matches = command.get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plain_flags_override_options() {
        let cli = Cli::try_parse_from([
            "sdk-log-parser",
            "plain",
            "-f",
            "app.log",
            "-l",
            "<timestamp> <level> ",
            "-d",
            "-m",
            "5",
            "--extract",
            "pattern",
            "--no-join",
            "-z",
        ])
        .unwrap();
        let mut options = ParserOptions::default();
        cli.command.apply(&mut options);
        assert_eq!(options.format, InputFormat::Plain);
        assert_eq!(options.layout, "<timestamp> <level> ");
        assert!(options.dry_run);
        assert!(!options.join_multiline);
        assert_eq!(options.effective_max_lines(), 5);
        assert_eq!(options.extraction, ExtractStrategy::Pattern);
        assert!(cli.command.common().unzip);
    }

    #[test]
    fn test_json_key_flags() {
        let cli = Cli::try_parse_from([
            "sdk-log-parser",
            "json",
            "-f",
            "app.log",
            "--message-key",
            "msg",
            "--timestamp-key",
            "datetime",
        ])
        .unwrap();
        let mut options = ParserOptions { dry_run: true, ..ParserOptions::default() };
        cli.command.apply(&mut options);
        assert_eq!(options.format, InputFormat::Json);
        assert_eq!(options.json.message, "msg");
        assert_eq!(options.json.timestamp, "datetime");
        assert_eq!(options.json.logger, "logger");
        // flags never clear what the config file set
        assert!(options.dry_run);
    }

    #[test]
    fn test_rejects_unknown_extraction() {
        assert!(Cli::try_parse_from(["sdk-log-parser", "csv", "-f", "a.csv", "--extract", "xml"]).is_err());
    }
}
