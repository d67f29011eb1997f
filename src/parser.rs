//! Parse orchestration: the single entry point of the engine.
//!
//! ```text
//! Start -> TextExtracted -> FormatDetected -> EntitiesExtracted -> Aggregated
//!   \___________\________________\_________________\______-> Failed(kind)
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{CasError, ErrorKind, ParseFailure, Result, Stage};
use crate::events::{EventSink, NoopSink, ParseEvent};
use crate::ingest::dispatcher::holdings_value;
use crate::ingest::formats::FormatExtractor;
use crate::ingest::{detect, Dispatcher, PdfTextExtractor, TextExtractor};
use crate::models::format::FormatType;
use crate::models::statement::{Metadata, ParsedStatement};

/// Default ceiling on document size.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

/// Per-call pipeline state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Start,
    TextExtracted,
    FormatDetected,
    EntitiesExtracted,
    Aggregated,
    Failed(ErrorKind),
}

impl std::fmt::Display for ParseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("START"),
            Self::TextExtracted => f.write_str("TEXT_EXTRACTED"),
            Self::FormatDetected => f.write_str("FORMAT_DETECTED"),
            Self::EntitiesExtracted => f.write_str("ENTITIES_EXTRACTED"),
            Self::Aggregated => f.write_str("AGGREGATED"),
            Self::Failed(kind) => write!(f, "FAILED({kind})"),
        }
    }
}

/// Bookkeeping for one parse call.
struct Run {
    tracking_id: String,
    state: ParseState,
    format: FormatType,
}

impl Run {
    fn new() -> Self {
        Self {
            tracking_id: Uuid::new_v4().to_string(),
            state: ParseState::Start,
            format: FormatType::Unknown,
        }
    }

    fn advance(&mut self, next: ParseState) {
        debug!(tracking_id = %self.tracking_id, from = %self.state, to = %next, "parse state");
        self.state = next;
    }
}

/// Turns statement documents into [`ParsedStatement`]s.
///
/// Holds no per-document state: one instance may serve concurrent calls
/// from any number of threads.
pub struct CasParser {
    extractor: Box<dyn TextExtractor>,
    sink: Arc<dyn EventSink>,
    max_document_bytes: usize,
}

impl Default for CasParser {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl CasParser {
    /// PDF parser reporting to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_extractor(Box::new(PdfTextExtractor::new()), sink)
    }

    /// Parser with a custom text extraction stage.
    pub fn with_extractor(extractor: Box<dyn TextExtractor>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            extractor,
            sink,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Apply limits from configuration.
    #[must_use]
    pub fn configured(mut self, config: &Config) -> Self {
        self.max_document_bytes = config.max_document_bytes();
        self
    }

    #[must_use]
    pub fn max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    /// Parse a document, with an optional password for encrypted PDFs.
    pub fn parse(
        &self,
        bytes: &[u8],
        password: Option<&str>,
    ) -> std::result::Result<ParsedStatement, ParseFailure> {
        self.parse_with_cancel(bytes, password, &CancellationToken::new())
    }

    /// Like [`parse`](Self::parse), polling `cancel` between stages.
    pub fn parse_with_cancel(
        &self,
        bytes: &[u8],
        password: Option<&str>,
        cancel: &CancellationToken,
    ) -> std::result::Result<ParsedStatement, ParseFailure> {
        let mut run = Run::new();
        info!(tracking_id = %run.tracking_id, bytes = bytes.len(), "parse started");
        self.emit(&ParseEvent::started(&run.tracking_id, bytes.len()));

        match self.run(&mut run, bytes, password, cancel) {
            Ok(statement) => {
                info!(
                    tracking_id = %run.tracking_id,
                    cas_type = %run.format,
                    holdings = statement.summary().holdings_count,
                    funds = statement.summary().funds_count,
                    "parse succeeded"
                );
                self.emit(&ParseEvent::succeeded(
                    &run.tracking_id,
                    run.format,
                    statement.summary(),
                ));
                Ok(statement)
            }
            Err(err) => {
                run.advance(ParseState::Failed(err.kind()));
                info!(tracking_id = %run.tracking_id, kind = %err.kind(), error = %err, "parse failed");
                self.emit(&ParseEvent::failed(&run.tracking_id, run.format, &err));
                Err(ParseFailure::new(&err, &run.tracking_id))
            }
        }
    }

    /// Extract text and classify it without running the extractors.
    pub fn detect(&self, bytes: &[u8], password: Option<&str>) -> Result<FormatType> {
        self.check_size(bytes)?;
        let text = self.extractor.extract(bytes, password)?;
        Ok(detect(&text))
    }

    fn run(
        &self,
        run: &mut Run,
        bytes: &[u8],
        password: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ParsedStatement> {
        cancel.check(Stage::TextExtraction)?;
        self.check_size(bytes)?;
        let text = self.extractor.extract(bytes, password)?;
        debug!(
            tracking_id = %run.tracking_id,
            extractor = self.extractor.name(),
            chars = text.len(),
            "text extracted"
        );
        run.advance(ParseState::TextExtracted);

        run.format = detect(&text);
        self.emit(&ParseEvent::detected(&run.tracking_id, run.format));
        cancel.check(Stage::EntityExtraction)?;
        let dispatcher = Dispatcher::for_format(run.format)?;
        run.advance(ParseState::FormatDetected);

        let extraction = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.extract(&text)))
            .map_err(|payload| {
                CasError::internal(run.format, Stage::EntityExtraction, panic_detail(&*payload))
            })??;
        debug!(
            tracking_id = %run.tracking_id,
            accounts = extraction.accounts.len(),
            holdings = extraction.holdings.len(),
            folios = extraction.funds.len(),
            holdings_value = ?holdings_value(&extraction.holdings),
            "entities extracted"
        );
        run.advance(ParseState::EntitiesExtracted);

        cancel.check(Stage::Aggregation)?;
        let body = aggregate(run.format, extraction)?;
        let meta = Metadata {
            cas_type: run.format,
            tracking_id: run.tracking_id.clone(),
            parser_version: env!("CARGO_PKG_VERSION").to_string(),
            parsed_at: Utc::now(),
        };
        run.advance(ParseState::Aggregated);

        Ok(ParsedStatement::new(
            body.investor,
            body.accounts,
            body.holdings,
            body.mutual_funds,
            body.summary,
            meta,
        ))
    }

    fn check_size(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.max_document_bytes {
            return Err(CasError::UnreadableDocument {
                detail: format!(
                    "document is {} bytes, limit is {}",
                    bytes.len(),
                    self.max_document_bytes
                ),
            });
        }
        Ok(())
    }

    /// Deliver an event; sink errors and panics are logged and dropped.
    fn emit(&self, event: &ParseEvent) {
        let sink = &self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(tracking_id = %event.tracking_id, event = event.name, error = %e, "event sink failed");
            }
            Err(payload) => {
                warn!(
                    tracking_id = %event.tracking_id,
                    event = event.name,
                    panic = %panic_detail(&*payload),
                    "event sink panicked"
                );
            }
        }
    }
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
