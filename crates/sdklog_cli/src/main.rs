mod cli;
mod files;

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sdklog_core::{ConsoleSink, LogParser, NdjsonSink, ParserOptions, TelemetrySink};

use cli::{Cli, CONNECTION_STRING_ENV};

/// Initialise the tracing / logging subsystem.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "sdklog_core=info,sdk_log_parser=info",
        1 => "sdklog_core=debug,sdk_log_parser=debug",
        _ => "sdklog_core=trace,sdk_log_parser=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_options(cli: &Cli) -> Result<ParserOptions> {
    let common = cli.command.common();
    let mut options = match &common.config {
        Some(path) => ParserOptions::load(path).with_context(|| format!("loading options from {}", path.display()))?,
        None => ParserOptions::default(),
    };
    cli.command.apply(&mut options);
    if options.run_name.is_none() {
        options.run_name = Some(files::run_name_for(&common.file));
    }

    let connection_string = common.connection_string.clone().or_else(|| std::env::var(CONNECTION_STRING_ENV).ok());
    if connection_string.is_none() && !options.dry_run {
        warn!("Connection string is missing, making it a dry-run.");
        options.dry_run = true;
    }
    Ok(options)
}

fn open_sink(options: &ParserOptions, output: Option<&PathBuf>, run: (&str, &str)) -> Result<Box<dyn TelemetrySink>> {
    if options.dry_run {
        return Ok(Box::new(ConsoleSink::stdout()));
    }
    let sink: Box<dyn TelemetrySink> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Box::new(NdjsonSink::new(file).with_cloud_role(run.0, run.1))
        }
        None => Box::new(NdjsonSink::new(io::stdout()).with_cloud_role(run.0, run.1)),
    };
    Ok(sink)
}

fn main() -> Result<()> {
    let cli = cli::parse();
    init_logging(cli.command.common().verbose);

    let options = load_options(&cli)?;
    let common = cli.command.common();
    let sources = files::resolve(&common.file, common.unzip)?;
    let log_files = sources.files();
    if log_files.is_empty() {
        warn!(path = %common.file.display(), "no log files found");
    }

    let mut parser = LogParser::new(options);
    info!(
        format = %parser.options().format,
        layout = %parser.layout(),
        dry_run = parser.options().dry_run,
        files = log_files.len(),
        "starting run"
    );
    let run = parser.run();
    let mut sink = open_sink(parser.options(), common.output.as_ref(), (run.run_name(), run.unique_id()))?;

    for file in log_files {
        match parser.parse_path(file, &mut sink) {
            Ok(report) => info!(
                file = %file.display(),
                records = report.records,
                skipped = report.skipped,
                extraction_failures = report.extraction_failures,
                "parsed file"
            ),
            Err(e) => error!(file = %file.display(), error = %e, "failed to parse file"),
        }
    }

    let summary = parser.run().summary();
    // keep stdout clean when it carries NDJSON records
    if !parser.options().dry_run && common.output.is_none() {
        eprintln!("{}", summary);
    } else {
        println!("{}", summary);
    }
    Ok(())
}
