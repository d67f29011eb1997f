use rust_decimal::Decimal;

use crate::aggregate::checked_sum;
use crate::error::{CasError, Result};
use crate::ingest::formats::{
    cams::CamsExtractor, cdsl::CdslExtractor, nsdl::NsdlExtractor, ExtractedAccount,
    ExtractedHolding, FormatExtractor,
};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio};

/// Routes a detected format to its extractor.
///
/// A closed set: adding a [`FormatType`] variant fails to compile until it
/// is handled here.
pub enum Dispatcher {
    Cdsl(CdslExtractor),
    Nsdl(NsdlExtractor),
    Cams(CamsExtractor),
}

impl Dispatcher {
    /// Build the extractor for `format`. `Unknown` is unsupported.
    pub fn for_format(format: FormatType) -> Result<Self> {
        match format {
            FormatType::Cdsl => Ok(Self::Cdsl(CdslExtractor::new()?)),
            FormatType::Nsdl => Ok(Self::Nsdl(NsdlExtractor::new()?)),
            FormatType::Cams => Ok(Self::Cams(CamsExtractor::new()?)),
            FormatType::Unknown => Err(CasError::UnsupportedFormat),
        }
    }

    /// Check if a format has an extractor.
    #[must_use]
    pub fn supports(format: FormatType) -> bool {
        match format {
            FormatType::Cdsl | FormatType::Nsdl | FormatType::Cams => true,
            FormatType::Unknown => false,
        }
    }

    fn inner(&self) -> &dyn FormatExtractor {
        match self {
            Self::Cdsl(e) => e,
            Self::Nsdl(e) => e,
            Self::Cams(e) => e,
        }
    }
}

impl FormatExtractor for Dispatcher {
    fn format(&self) -> FormatType {
        self.inner().format()
    }

    fn extract_investor_info(&self, text: &str) -> Result<InvestorInfo> {
        self.inner().extract_investor_info(text)
    }

    fn extract_accounts(&self, text: &str) -> Result<Vec<ExtractedAccount>> {
        self.inner().extract_accounts(text)
    }

    fn extract_holdings(&self, text: &str) -> Result<Vec<ExtractedHolding>> {
        self.inner().extract_holdings(text)
    }

    fn extract_funds(&self, text: &str) -> Result<Vec<MutualFundFolio>> {
        self.inner().extract_funds(text)
    }
}

/// Sum of current values, used in debug logging after extraction.
#[must_use]
pub fn holdings_value(holdings: &[ExtractedHolding]) -> Option<Decimal> {
    checked_sum(holdings.iter().map(|h| h.current_value))
}
