use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cas-parser",
    version,
    about = "Extract holdings from consolidated account statements",
    after_help = "Results are written to stdout as JSON; logs go to stderr (set RUST_LOG to \
                  change verbosity). Settings are read from ./cas-parser.toml unless --config \
                  is given."
)]
pub struct Cli {
    /// Path to a cas-parser.toml settings file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Pretty-print JSON output (overrides the configured format)
    #[arg(long, global = true, conflicts_with = "minified")]
    pub pretty: bool,

    /// Minified JSON output (overrides the configured format)
    #[arg(long, global = true)]
    pub minified: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse one statement into the canonical holdings record.
    ///
    /// Exits with status 1 and prints a failure object
    /// ({kind, message, trackingId}) when the statement cannot be parsed.
    Parse {
        /// Statement file (PDF, or text with --text)
        file: String,
        /// Password for an encrypted PDF
        #[arg(short, long)]
        password: Option<String>,
        /// Treat the file as already-extracted UTF-8 text
        #[arg(long)]
        text: bool,
    },

    /// Report which issuer family a statement belongs to
    Detect {
        /// Statement file (PDF, or text with --text)
        file: String,
        /// Password for an encrypted PDF
        #[arg(short, long)]
        password: Option<String>,
        /// Treat the file as already-extracted UTF-8 text
        #[arg(long)]
        text: bool,
    },

    /// Parse several statements in parallel, one result per file
    Batch {
        /// Statement files
        #[arg(required = true)]
        files: Vec<String>,
        /// Password tried for every encrypted PDF
        #[arg(short, long)]
        password: Option<String>,
        /// Treat the files as already-extracted UTF-8 text
        #[arg(long)]
        text: bool,
    },

    /// List supported statement formats and their detection markers
    Formats,
}
