use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::FormatType;

/// Investor details printed on the statement cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorInfo {
    pub name: Option<String>,
    /// PAN (permanent account number).
    pub tax_id: Option<String>,
    pub address: Option<String>,
}

impl InvestorInfo {
    /// True when not a single investor field was located.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tax_id.is_none() && self.address.is_none()
    }
}

/// A dematerialised securities account at a depository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DematAccount {
    pub depository: String,
    /// DP ID of the depository participant.
    pub participant_id: String,
    pub client_id: String,
    /// Ids of the holdings that belong to this account.
    pub holding_ids: Vec<String>,
}

/// A security position held in a demat account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Stable synthetic id derived from account and ISIN.
    pub id: String,
    /// ISIN of the security.
    pub security_id: String,
    pub name: String,
    pub quantity: Decimal,
    pub current_value: Decimal,
    pub category: String,
}

/// Valuation of one scheme inside a folio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeValuation {
    pub scheme_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav: Option<Decimal>,
    pub current_value: Decimal,
}

/// An AMC folio and the schemes valued under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualFundFolio {
    pub amc: String,
    pub folio_number: String,
    pub schemes: Vec<SchemeValuation>,
}

impl MutualFundFolio {
    /// Folio value; `None` when the scheme values overflow.
    #[must_use]
    pub fn value(&self) -> Option<Decimal> {
        self.schemes
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.current_value))
    }
}

/// Aggregate figures, always derived from the holding and folio lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_value: Decimal,
    pub holdings_value: Decimal,
    pub mutual_funds_value: Decimal,
    pub holdings_count: usize,
    /// Number of scheme valuations across all folios.
    pub funds_count: usize,
    /// Category name to cumulative holding value.
    pub categories: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub cas_type: FormatType,
    pub tracking_id: String,
    pub parser_version: String,
    pub parsed_at: DateTime<Utc>,
}

/// Canonical result of a successful parse.
///
/// A point-in-time snapshot: it is only ever built by the aggregator and
/// exposes read-only accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStatement {
    investor: InvestorInfo,
    accounts: Vec<DematAccount>,
    holdings: Vec<Holding>,
    mutual_funds: Vec<MutualFundFolio>,
    summary: Summary,
    meta: Metadata,
}

impl ParsedStatement {
    pub(crate) fn new(
        investor: InvestorInfo,
        accounts: Vec<DematAccount>,
        holdings: Vec<Holding>,
        mutual_funds: Vec<MutualFundFolio>,
        summary: Summary,
        meta: Metadata,
    ) -> Self {
        Self {
            investor,
            accounts,
            holdings,
            mutual_funds,
            summary,
            meta,
        }
    }

    #[must_use]
    pub fn investor(&self) -> &InvestorInfo {
        &self.investor
    }

    #[must_use]
    pub fn accounts(&self) -> &[DematAccount] {
        &self.accounts
    }

    #[must_use]
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    #[must_use]
    pub fn mutual_funds(&self) -> &[MutualFundFolio] {
        &self.mutual_funds
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    #[must_use]
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Compare everything except the per-call tracking id and timestamp.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.investor == other.investor
            && self.accounts == other.accounts
            && self.holdings == other.holdings
            && self.mutual_funds == other.mutual_funds
            && self.summary == other.summary
            && self.meta.cas_type == other.meta.cas_type
            && self.meta.parser_version == other.meta.parser_version
    }
}
