use serde::Serialize;
use thiserror::Error;

use crate::models::format::FormatType;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TextExtraction,
    EntityExtraction,
    Aggregation,
}

impl Stage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextExtraction => "text_extraction",
            Self::EntityExtraction => "entity_extraction",
            Self::Aggregation => "aggregation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CasError {
    #[error("unreadable document: {detail}")]
    UnreadableDocument { detail: String },

    #[error("document is encrypted and no password was supplied")]
    PasswordRequired,

    #[error("incorrect password for encrypted document")]
    IncorrectPassword,

    #[error("unsupported statement format")]
    UnsupportedFormat,

    #[error("{format} statement is missing its {section} section")]
    ExtractionIncomplete {
        format: FormatType,
        section: &'static str,
    },

    #[error("internal extraction error ({format}, {stage}): {detail}")]
    InternalExtraction {
        format: FormatType,
        stage: Stage,
        detail: String,
    },

    #[error("parse cancelled before {stage}")]
    Cancelled { stage: Stage },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl CasError {
    /// Coarse classification used in failure payloads and events.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnreadableDocument { .. } | Self::Io(_) => ErrorKind::UnreadableDocument,
            Self::PasswordRequired => ErrorKind::PasswordRequired,
            Self::IncorrectPassword => ErrorKind::IncorrectPassword,
            Self::UnsupportedFormat => ErrorKind::UnsupportedFormat,
            Self::ExtractionIncomplete { .. } => ErrorKind::ExtractionIncomplete,
            Self::InternalExtraction { .. } | Self::Json(_) | Self::Config(_) => {
                ErrorKind::InternalExtractionError
            }
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn internal(format: FormatType, stage: Stage, detail: impl Into<String>) -> Self {
        Self::InternalExtraction {
            format,
            stage,
            detail: detail.into(),
        }
    }
}

/// Failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnreadableDocument,
    PasswordRequired,
    IncorrectPassword,
    UnsupportedFormat,
    ExtractionIncomplete,
    InternalExtractionError,
    Cancelled,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnreadableDocument => "UNREADABLE_DOCUMENT",
            Self::PasswordRequired => "PASSWORD_REQUIRED",
            Self::IncorrectPassword => "INCORRECT_PASSWORD",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::ExtractionIncomplete => "EXTRACTION_INCOMPLETE",
            Self::InternalExtractionError => "INTERNAL_EXTRACTION_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure returned by [`crate::parser::CasParser::parse`].
///
/// Never accompanied by a partial statement.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{kind}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ParseFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub tracking_id: String,
}

impl ParseFailure {
    #[must_use]
    pub fn new(error: &CasError, tracking_id: &str) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            tracking_id: tracking_id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(CasError::PasswordRequired.kind(), ErrorKind::PasswordRequired);
        assert_eq!(CasError::IncorrectPassword.kind(), ErrorKind::IncorrectPassword);
        assert_eq!(CasError::UnsupportedFormat.kind(), ErrorKind::UnsupportedFormat);
        let incomplete = CasError::ExtractionIncomplete {
            format: FormatType::Cdsl,
            section: "investor",
        };
        assert_eq!(incomplete.kind(), ErrorKind::ExtractionIncomplete);
        let internal = CasError::internal(FormatType::Nsdl, Stage::EntityExtraction, "boom");
        assert_eq!(internal.kind(), ErrorKind::InternalExtractionError);
    }

    #[test]
    fn internal_error_names_format_and_stage() {
        let err = CasError::internal(FormatType::Cams, Stage::EntityExtraction, "bad pattern");
        let msg = err.to_string();
        assert!(msg.contains("CAMS"));
        assert!(msg.contains("entity_extraction"));
        assert!(msg.contains("bad pattern"));
    }

    #[test]
    fn failure_serializes_camel_case() {
        let failure = ParseFailure::new(&CasError::PasswordRequired, "abc");
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"PASSWORD_REQUIRED\""));
        assert!(json.contains("\"trackingId\":\"abc\""));
    }
}
