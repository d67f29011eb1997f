//! Normalisation of extracted entities into the canonical statement body.
//!
//! Pure: no I/O and no logging. Every figure in the [`Summary`] is computed
//! here from the holding and folio lists; nothing pre-computed is accepted.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::error::{CasError, Result, Stage};
use crate::ingest::formats::{AccountKey, Extraction};
use crate::ingest::hasher::holding_id;
use crate::models::format::FormatType;
use crate::models::statement::{DematAccount, Holding, InvestorInfo, MutualFundFolio, Summary};

/// Canonical statement body before metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub investor: InvestorInfo,
    pub accounts: Vec<DematAccount>,
    pub holdings: Vec<Holding>,
    pub mutual_funds: Vec<MutualFundFolio>,
    pub summary: Summary,
}

/// Link holdings to accounts, assign stable ids and compute the summary.
///
/// A holding listed before any account header, or under a header that was
/// not captured as an account, belongs to the first account.
pub fn aggregate(format: FormatType, extraction: Extraction) -> Result<Aggregate> {
    let Extraction {
        investor,
        accounts: extracted_accounts,
        holdings: extracted_holdings,
        funds,
    } = extraction;

    if !extracted_holdings.is_empty() && extracted_accounts.is_empty() {
        return Err(CasError::ExtractionIncomplete {
            format,
            section: "accounts",
        });
    }

    let mut accounts: Vec<DematAccount> = extracted_accounts
        .iter()
        .map(|a| DematAccount {
            depository: a.depository.as_str().to_string(),
            participant_id: a.key.participant_id.clone(),
            client_id: a.key.client_id.clone(),
            holding_ids: Vec::new(),
        })
        .collect();
    let index_of: HashMap<&AccountKey, usize> = extracted_accounts
        .iter()
        .enumerate()
        .map(|(i, a)| (&a.key, i))
        .collect();

    let mut seen: HashMap<(usize, String), usize> = HashMap::new();
    let mut holdings = Vec::with_capacity(extracted_holdings.len());
    for h in extracted_holdings {
        let idx = h
            .account
            .as_ref()
            .and_then(|key| index_of.get(key).copied())
            .unwrap_or(0);
        let account = &mut accounts[idx];

        let occurrence = seen.entry((idx, h.security_id.clone())).or_insert(0);
        let id = holding_id(
            &account.depository,
            &account.participant_id,
            &account.client_id,
            &h.security_id,
            *occurrence,
        );
        *occurrence += 1;

        account.holding_ids.push(id.clone());
        holdings.push(Holding {
            id,
            security_id: h.security_id,
            name: h.name,
            quantity: h.quantity,
            current_value: h.current_value.max(Decimal::ZERO),
            category: h.category,
        });
    }

    let summary = summarize(format, &holdings, &funds)?;
    Ok(Aggregate {
        investor,
        accounts,
        holdings,
        mutual_funds: funds,
        summary,
    })
}

/// Compute the summary from the authoritative lists.
///
/// Amounts come from untrusted text, so every addition is checked; a total
/// beyond `Decimal`'s range is an internal error rather than a panic.
pub fn summarize(
    format: FormatType,
    holdings: &[Holding],
    funds: &[MutualFundFolio],
) -> Result<Summary> {
    let overflow = |what: &str| {
        CasError::internal(
            format,
            Stage::Aggregation,
            format!("{what} exceeds the representable range"),
        )
    };

    let holdings_value = checked_sum(holdings.iter().map(|h| h.current_value))
        .ok_or_else(|| overflow("holdings value"))?;
    let mutual_funds_value = funds
        .iter()
        .map(MutualFundFolio::value)
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v?))
        .ok_or_else(|| overflow("mutual funds value"))?;

    let mut categories: BTreeMap<String, Decimal> = BTreeMap::new();
    for h in holdings {
        let slot = categories.entry(h.category.clone()).or_default();
        *slot = slot
            .checked_add(h.current_value)
            .ok_or_else(|| overflow("category value"))?;
    }

    Ok(Summary {
        total_value: holdings_value
            .checked_add(mutual_funds_value)
            .ok_or_else(|| overflow("total value"))?,
        holdings_value,
        mutual_funds_value,
        holdings_count: holdings.len(),
        funds_count: funds.iter().map(|f| f.schemes.len()).sum(),
        categories,
    })
}

/// Sum that reports overflow as `None`.
#[must_use]
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}
