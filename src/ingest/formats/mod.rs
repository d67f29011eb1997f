pub mod cams;
pub mod cdsl;
pub mod common;
pub mod nsdl;

use rust_decimal::Decimal;

use crate::error::{CasError, Result};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio};

/// Identifies a demat account within one statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub participant_id: String,
    pub client_id: String,
}

/// An account header as found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAccount {
    pub depository: FormatType,
    pub key: AccountKey,
}

/// A holding row, tagged with the account header it appeared under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHolding {
    /// `None` when the row appeared before any account header.
    pub account: Option<AccountKey>,
    pub security_id: String,
    pub name: String,
    pub quantity: Decimal,
    pub current_value: Decimal,
    pub category: String,
}

/// Everything one extractor pulled out of a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub investor: InvestorInfo,
    pub accounts: Vec<ExtractedAccount>,
    pub holdings: Vec<ExtractedHolding>,
    pub funds: Vec<MutualFundFolio>,
}

/// Layout-specific extraction for one issuer family.
///
/// The text passed in has already been matched to this family by the
/// detector. A malformed row degrades to zero values; only a missing
/// mandatory section fails the whole statement.
pub trait FormatExtractor: Send + Sync {
    fn format(&self) -> FormatType;

    /// Fails with `ExtractionIncomplete` when no investor field is present.
    fn extract_investor_info(&self, text: &str) -> Result<InvestorInfo>;

    fn extract_accounts(&self, text: &str) -> Result<Vec<ExtractedAccount>>;

    fn extract_holdings(&self, text: &str) -> Result<Vec<ExtractedHolding>>;

    fn extract_funds(&self, text: &str) -> Result<Vec<MutualFundFolio>>;

    /// Run all four extractions and check cross-section requirements.
    fn extract(&self, text: &str) -> Result<Extraction> {
        let investor = self.extract_investor_info(text)?;
        let accounts = self.extract_accounts(text)?;
        let holdings = self.extract_holdings(text)?;
        let funds = self.extract_funds(text)?;

        if !holdings.is_empty() && accounts.is_empty() {
            return Err(CasError::ExtractionIncomplete {
                format: self.format(),
                section: "accounts",
            });
        }

        Ok(Extraction {
            investor,
            accounts,
            holdings,
            funds,
        })
    }
}
