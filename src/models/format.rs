use serde::Serialize;

/// Issuer family a statement was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatType {
    /// Central Depository Services (India) Limited.
    #[serde(rename = "CDSL")]
    Cdsl,
    /// National Securities Depository Limited.
    #[serde(rename = "NSDL")]
    Nsdl,
    /// Registrar-issued statements (CAMS, KFintech).
    #[serde(rename = "CAMS")]
    Cams,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl FormatType {
    /// Every recognisable format, in detection priority order.
    pub const KNOWN: [FormatType; 3] = [Self::Cdsl, Self::Nsdl, Self::Cams];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdsl => "CDSL",
            Self::Nsdl => "NSDL",
            Self::Cams => "CAMS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
