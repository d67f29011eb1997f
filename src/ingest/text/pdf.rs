use std::panic::{catch_unwind, AssertUnwindSafe};

use lopdf::encryption::DecryptionError;
use lopdf::Document;
use pdf_extract::{output_doc, PlainTextOutput};
use tracing::debug;

use crate::error::{CasError, Result};
use crate::ingest::text::{normalize_text, TextExtractor};

/// PDF text extractor with password handling.
///
/// `lopdf` loads the document and authenticates the password so wrong and
/// missing passwords can be told apart; `pdf-extract` then flattens the
/// content of the already opened document.
pub struct PdfTextExtractor;

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn unreadable(detail: impl Into<String>) -> CasError {
    CasError::UnreadableDocument {
        detail: detail.into(),
    }
}

impl PdfTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Make the document's objects readable.
    ///
    /// Documents that open with an empty user password are decrypted while
    /// loading; any supplied password is then irrelevant.
    fn unlock(doc: &mut Document, password: Option<&str>) -> Result<()> {
        if !doc.is_encrypted() || doc.encryption_state.is_some() {
            return Ok(());
        }

        let Some(pw) = password else {
            return Err(CasError::PasswordRequired);
        };
        match doc.authenticate_password(pw) {
            Ok(()) => {}
            Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword)) => {
                return Err(CasError::IncorrectPassword)
            }
            Err(e) => return Err(unreadable(format!("PDF encryption error: {e}"))),
        }
        doc.decrypt(pw)
            .map_err(|e| unreadable(format!("PDF decryption error: {e}")))
    }
}

impl TextExtractor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, bytes: &[u8], password: Option<&str>) -> Result<String> {
        if !bytes.starts_with(b"%PDF") {
            return Err(unreadable("missing %PDF header"));
        }

        let mut doc =
            Document::load_mem(bytes).map_err(|e| unreadable(format!("PDF load error: {e}")))?;
        let encrypted = doc.is_encrypted();
        Self::unlock(&mut doc, password)?;
        debug!(encrypted, pages = doc.get_pages().len(), "decoding PDF text");

        // pdf-extract panics on some malformed font programs.
        let decoded = catch_unwind(AssertUnwindSafe(|| {
            let mut text = String::new();
            {
                let mut output = PlainTextOutput::new(&mut text);
                output_doc(&doc, &mut output)?;
            }
            Ok::<_, pdf_extract::OutputError>(text)
        }));

        let text = match decoded {
            Ok(Ok(text)) => normalize_text(&text),
            Ok(Err(e)) => return Err(unreadable(format!("PDF extraction error: {e}"))),
            Err(_) => return Err(unreadable("PDF decoder aborted on malformed content")),
        };
        if text.trim().is_empty() {
            return Err(unreadable(if encrypted {
                "no text recovered from encrypted content"
            } else {
                "no extractable text (image-only document?)"
            }));
        }
        Ok(text)
    }
}
