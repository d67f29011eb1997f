use crate::error::{CasError, Result};
use crate::ingest::text::{normalize_text, TextExtractor};

/// Treats the document as already-flattened UTF-8 text.
/// Used for statements exported to text by another tool, and in tests.
pub struct PlainTextExtractor;

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn extract(&self, bytes: &[u8], _password: Option<&str>) -> Result<String> {
        let text = std::str::from_utf8(bytes).map_err(|e| CasError::UnreadableDocument {
            detail: format!("text is not valid UTF-8: {e}"),
        })?;
        if text.trim().is_empty() {
            return Err(CasError::UnreadableDocument {
                detail: "document is empty".into(),
            });
        }
        Ok(normalize_text(text))
    }
}
