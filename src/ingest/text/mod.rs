pub mod pdf;
pub mod plaintext;

use crate::error::Result;

/// Turns raw document bytes into flattened text.
///
/// Implementations must not keep any state between calls; the parser may
/// drive one instance from several threads at once.
pub trait TextExtractor: Send + Sync {
    /// Short name for logs ("pdf", "plaintext").
    fn name(&self) -> &str;

    /// Decrypt (when a password is supplied) and flatten the document.
    fn extract(&self, bytes: &[u8], password: Option<&str>) -> Result<String>;
}

/// Normalise decoder output so line-oriented extractors see one layout.
///
/// Page breaks become line breaks, non-breaking spaces become spaces and
/// trailing whitespace is dropped. Line order is preserved.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.replace("\r\n", "\n").split(['\n', '\r', '\x0C']) {
        let line = line.replace('\u{a0}', " ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_splits_pages_into_lines() {
        let text = normalize_text("Page one\x0CPage two\r\nlast  ");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Page one", "Page two", "last"]);
    }

    #[test]
    fn normalize_replaces_nbsp() {
        let text = normalize_text("DP ID:\u{a0}12345678");
        assert_eq!(text.trim_end(), "DP ID: 12345678");
    }
}
