// Pedantic lint configuration for the crate.
// - cast_possible_truncation: Document sizes and config limits fit in usize
// - missing_errors_doc: Error handling is self-evident from Result types
// - missing_panics_doc: Panics are rare and documented inline
// - too_many_lines: Layout parsers keep each table walk in one function
// - similar_names: Variable naming is contextually clear
// - option_if_let_else: if-let is often clearer
// - fn_params_excessive_bools: CLI flags are naturally boolean
// - needless_pass_by_value: Sometimes clearer semantically
// - match_same_arms: Combined arms can reduce readability
// - module_name_repetitions: Extractor types read better with their family name
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::option_if_let_else,
    clippy::fn_params_excessive_bools,
    clippy::needless_pass_by_value,
    clippy::match_same_arms,
    clippy::module_name_repetitions
)]

pub mod aggregate;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod models;
pub mod parser;

pub use cancel::CancellationToken;
pub use error::{CasError, ErrorKind, ParseFailure};
pub use events::{EventSink, JsonlSink, NoopSink, ParseEvent, TracingSink};
pub use models::{FormatType, ParsedStatement};
pub use parser::CasParser;
