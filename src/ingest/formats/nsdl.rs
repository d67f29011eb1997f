//! NSDL consolidated account statement layout.
//!
//! NSDL participant ids carry an `IN` prefix; CDSL accounts listed in the same
//! statement keep their 8-digit ids. Holding rows read
//! `ISIN name… [face value] shares price value`.

use regex::Regex;

use crate::error::Result;
use crate::ingest::formats::cdsl::category_from_isin;
use crate::ingest::formats::common::{
    clean_amount, clean_quantity, compile, holding_row, is_isin, labelled_address, require_investor,
    squash, FolioSection, PanFinder,
};
use crate::ingest::formats::{AccountKey, ExtractedAccount, ExtractedHolding, FormatExtractor};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio};

const FORMAT: FormatType = FormatType::Nsdl;

pub struct NsdlExtractor {
    holder: Regex,
    name: Regex,
    account: Regex,
    category: Regex,
    pan: PanFinder,
    folios: FolioSection,
}

impl NsdlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            holder: compile(
                FORMAT,
                r"(?i)\b(?:sole\s*/\s*first|first|sole)\s+holder(?:\s+name)?\s*[:\-]\s*(.+?)(?:\s*\(|\s{2,}|$)",
            )?,
            name: compile(FORMAT, r"(?i)^\s*name\s*[:\-]\s*(.+?)(?:\s{2,}|$)")?,
            account: compile(
                FORMAT,
                r"(?i)\bDP\s*ID\s*[:\-]?\s*(IN\d{6}|\d{8})\b.*?\bCLIENT\s*ID\s*[:\-]?\s*(\d{8})\b",
            )?,
            category: compile(
                FORMAT,
                r"(?i)^(equit(?:y|ies)|preference\s+shares|(?:corporate\s+)?bonds|debentures|government\s+securities|money\s+market\s+instruments|mutual\s+funds?)\b[^0-9]*$",
            )?,
            pan: PanFinder::new(FORMAT)?,
            folios: FolioSection::new(FORMAT)?,
        })
    }

    fn account_key(&self, line: &str) -> Option<AccountKey> {
        self.account.captures(line).map(|c| AccountKey {
            participant_id: c[1].to_ascii_uppercase(),
            client_id: c[2].to_string(),
        })
    }

    fn category_heading(&self, line: &str) -> Option<String> {
        let heading = self.category.captures(line)?[1].to_ascii_lowercase();
        let label = if heading.starts_with("equit") {
            "Equity"
        } else if heading.starts_with("preference") {
            "Preference Shares"
        } else if heading.contains("bonds") {
            "Bonds"
        } else if heading.starts_with("debentures") {
            "Debentures"
        } else if heading.starts_with("government") {
            "Government Securities"
        } else if heading.starts_with("money") {
            "Money Market"
        } else {
            "Mutual Fund"
        };
        Some(label.to_string())
    }
}

/// NSDL ids start with `IN`; plain 8-digit ids belong to CDSL.
fn depository_of(key: &AccountKey) -> FormatType {
    if key.participant_id.starts_with("IN") {
        FormatType::Nsdl
    } else {
        FormatType::Cdsl
    }
}

impl FormatExtractor for NsdlExtractor {
    fn format(&self) -> FormatType {
        FORMAT
    }

    fn extract_investor_info(&self, text: &str) -> Result<InvestorInfo> {
        let name = text
            .lines()
            .find_map(|line| self.holder.captures(line).map(|c| squash(&c[1])))
            .or_else(|| {
                text.lines()
                    .find_map(|line| self.name.captures(line).map(|c| squash(&c[1])))
            });
        let info = InvestorInfo {
            name,
            tax_id: self.pan.find(text),
            address: labelled_address(text),
        };
        require_investor(FORMAT, info)
    }

    fn extract_accounts(&self, text: &str) -> Result<Vec<ExtractedAccount>> {
        let mut accounts: Vec<ExtractedAccount> = Vec::new();
        for key in text.lines().filter_map(|line| self.account_key(line)) {
            if !accounts.iter().any(|a| a.key == key) {
                accounts.push(ExtractedAccount {
                    depository: depository_of(&key),
                    key,
                });
            }
        }
        Ok(accounts)
    }

    fn extract_holdings(&self, text: &str) -> Result<Vec<ExtractedHolding>> {
        let mut holdings = Vec::new();
        let mut account: Option<AccountKey> = None;
        let mut category: Option<String> = None;
        let mut in_folios = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(key) = self.account_key(trimmed) {
                account = Some(key);
                category = None;
                in_folios = false;
                continue;
            }
            if self.folios.is_start(trimmed) {
                in_folios = true;
                continue;
            }
            if in_folios {
                continue;
            }
            if let Some(heading) = self.category_heading(trimmed) {
                category = Some(heading);
                continue;
            }

            let cells: Vec<&str> = trimmed.split_whitespace().collect();
            let Some((isin, rest)) = cells.split_first() else {
                continue;
            };
            if !is_isin(isin) {
                continue;
            }
            let Some(row) = holding_row(rest) else {
                tracing::debug!(format = %FORMAT, isin, "holding row without a name");
                continue;
            };
            // Shares sit directly before the market price column.
            let quantity = match row.figures.as_slice() {
                [] => Default::default(),
                [shares] => clean_quantity(shares),
                [.., shares, _price] => clean_quantity(shares),
            };
            holdings.push(ExtractedHolding {
                account: account.clone(),
                security_id: (*isin).to_string(),
                name: row.label_text(),
                quantity,
                current_value: clean_amount(row.value),
                category: category
                    .clone()
                    .unwrap_or_else(|| category_from_isin(isin).to_string()),
            });
        }
        Ok(holdings)
    }

    fn extract_funds(&self, text: &str) -> Result<Vec<MutualFundFolio>> {
        Ok(self.folios.extract(text))
    }
}
