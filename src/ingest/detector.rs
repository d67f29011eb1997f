//! Issuer format detection.
//!
//! Rules are checked in a fixed priority order and the first match wins, so a
//! depository statement that mentions a registrar in its boilerplate is still
//! classified as a depository statement.

use serde::Serialize;

use crate::models::format::FormatType;

/// A signature for one issuer family.
///
/// Every group must match; a group matches when any of its markers occurs
/// in the upper-cased text.
#[derive(Debug, Serialize)]
pub struct SignatureRule {
    pub format: FormatType,
    pub required: &'static [&'static [&'static str]],
}

impl SignatureRule {
    #[must_use]
    pub fn matches(&self, upper: &str) -> bool {
        self.required
            .iter()
            .all(|group| group.iter().any(|marker| upper.contains(marker)))
    }
}

/// Detection rules in priority order: CDSL, then NSDL, then registrar.
pub static SIGNATURES: &[SignatureRule] = &[
    SignatureRule {
        format: FormatType::Cdsl,
        required: &[&["CDSL", "CENTRAL DEPOSITORY SERVICES"]],
    },
    SignatureRule {
        format: FormatType::Nsdl,
        required: &[&["NSDL", "NATIONAL SECURITIES DEPOSITORY"]],
    },
    SignatureRule {
        format: FormatType::Cams,
        required: &[
            &["CAMS", "KFINTECH", "KARVY", "COMPUTER AGE MANAGEMENT"],
            &["FOLIO"],
        ],
    },
];

/// Classify extracted text. Returns [`FormatType::Unknown`] when no rule matches.
#[must_use]
pub fn detect(text: &str) -> FormatType {
    let upper = text.to_uppercase();
    SIGNATURES
        .iter()
        .find(|rule| rule.matches(&upper))
        .map_or(FormatType::Unknown, |rule| rule.format)
}
