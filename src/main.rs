// Inherit lint configuration from lib.rs for consistency
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::fn_params_excessive_bools,
    clippy::needless_pass_by_value
)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use cas_parser::cli::commands::{Cli, Command};
use cas_parser::cli::output;
use cas_parser::config::Config;
use cas_parser::error::ParseFailure;
use cas_parser::events::{EventSink, JsonlSink, TracingSink};
use cas_parser::ingest::detector::SIGNATURES;
use cas_parser::ingest::{Dispatcher, PlainTextExtractor};
use cas_parser::models::{FormatType, ParsedStatement};
use cas_parser::parser::CasParser;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", output::format_error(&e));
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<ExitCode, Box<dyn std::fmt::Display>>;

fn map_err(e: impl std::fmt::Display + 'static) -> Box<dyn std::fmt::Display> {
    Box::new(e.to_string())
}

/// Output settings shared by every command.
struct Ctx {
    config: Config,
    pretty: bool,
}

impl Ctx {
    fn print<T: Serialize>(&self, value: &T) {
        println!("{}", output::format_output(value, self.pretty));
    }

    fn parser(&self, text: bool) -> CasParser {
        let sink: Arc<dyn EventSink> = match self.config.event_log_path() {
            Some(path) => match JsonlSink::open(&path) {
                Ok(sink) => Arc::new(sink),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "event log unavailable");
                    Arc::new(TracingSink)
                }
            },
            None => Arc::new(TracingSink),
        };
        let parser = if text {
            CasParser::with_extractor(Box::new(PlainTextExtractor::new()), sink)
        } else {
            CasParser::new(sink)
        };
        parser.configured(&self.config)
    }
}

fn run(cli: Cli) -> CmdResult {
    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::from_cwd().map_err(map_err)?,
    };
    init_tracing(&config.settings.logging.filter);

    let pretty = if cli.pretty {
        true
    } else if cli.minified {
        false
    } else {
        config.pretty_output()
    };
    let ctx = Ctx { config, pretty };

    match cli.command {
        Command::Parse {
            file,
            password,
            text,
        } => cmd_parse(&ctx, &file, password.as_deref(), text),
        Command::Detect {
            file,
            password,
            text,
        } => cmd_detect(&ctx, &file, password.as_deref(), text),
        Command::Batch {
            files,
            password,
            text,
        } => cmd_batch(&ctx, &files, password.as_deref(), text),
        Command::Formats => cmd_formats(&ctx),
    }
}

/// Logs go to stderr so stdout carries only JSON.
fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn cmd_parse(ctx: &Ctx, file: &str, password: Option<&str>, text: bool) -> CmdResult {
    let bytes = std::fs::read(file).map_err(|e| map_err(format!("cannot read {file}: {e}")))?;
    match ctx.parser(text).parse(&bytes, password) {
        Ok(statement) => {
            ctx.print(&statement);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            ctx.print(&failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectOutput<'a> {
    file: &'a str,
    cas_type: FormatType,
    supported: bool,
}

fn cmd_detect(ctx: &Ctx, file: &str, password: Option<&str>, text: bool) -> CmdResult {
    let bytes = std::fs::read(file).map_err(|e| map_err(format!("cannot read {file}: {e}")))?;
    let cas_type = ctx
        .parser(text)
        .detect(&bytes, password)
        .map_err(map_err)?;
    ctx.print(&DetectOutput {
        file,
        cas_type,
        supported: Dispatcher::supports(cas_type),
    });
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem<'a> {
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    statement: Option<ParsedStatement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<ParseFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BatchItem<'_> {
    fn ok(&self) -> bool {
        self.statement.is_some()
    }
}

fn cmd_batch(ctx: &Ctx, files: &[String], password: Option<&str>, text: bool) -> CmdResult {
    let parser = ctx.parser(text);
    let items: Vec<BatchItem<'_>> = files
        .par_iter()
        .map(|file| {
            let mut item = BatchItem {
                file,
                statement: None,
                failure: None,
                error: None,
            };
            match std::fs::read(file) {
                Ok(bytes) => match parser.parse(&bytes, password) {
                    Ok(statement) => item.statement = Some(statement),
                    Err(failure) => item.failure = Some(failure),
                },
                Err(e) => item.error = Some(format!("cannot read {file}: {e}")),
            }
            item
        })
        .collect();

    let all_ok = items.iter().all(BatchItem::ok);
    ctx.print(&items);
    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_formats(ctx: &Ctx) -> CmdResult {
    ctx.print(&SIGNATURES);
    Ok(ExitCode::SUCCESS)
}
