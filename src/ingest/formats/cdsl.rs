//! CDSL consolidated account statement layout.
//!
//! ```text
//! Name: ASHA RAO            PAN: ABCDE1234F
//! Address: 12 MG ROAD, BENGALURU 560038
//! DP Name: SAMPLE BROKING LTD   DP ID: 12345678 CLIENT ID: 87654321
//! EQUITY SHARES
//! INE002A01018 RELIANCE INDUSTRIES LTD 40 2,886.41 ₹1,15,456.40
//! ```
//!
//! Holding rows read `ISIN name… quantity [price] value`.

use regex::Regex;

use crate::error::Result;
use crate::ingest::formats::common::{
    clean_amount, clean_quantity, compile, holding_row, is_isin, labelled_address, require_investor,
    squash, FolioSection, PanFinder, DEFAULT_CATEGORY,
};
use crate::ingest::formats::{AccountKey, ExtractedAccount, ExtractedHolding, FormatExtractor};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio};

const FORMAT: FormatType = FormatType::Cdsl;

pub struct CdslExtractor {
    name: Regex,
    account: Regex,
    bo_account: Regex,
    category: Regex,
    pan: PanFinder,
    folios: FolioSection,
}

impl CdslExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: compile(
                FORMAT,
                r"(?i)^\s*(?:investor\s+|first\s+holder\s+|sole\s+holder\s+)?name\s*[:\-]\s*(.+?)(?:\s{2,}|$)",
            )?,
            account: compile(
                FORMAT,
                r"(?i)\bDP\s*ID\s*[:\-]?\s*(\d{8})\b.*?\bCLIENT\s*ID\s*[:\-]?\s*(\d{8})\b",
            )?,
            bo_account: compile(FORMAT, r"(?i)\bBO\s*ID\s*[:\-]?\s*(\d{8})(\d{8})\b")?,
            category: compile(
                FORMAT,
                r"(?i)^(equity(?:\s+shares)?|preference\s+shares|bonds|debentures|government\s+securities|commercial\s+paper|mutual\s+fund\s+units\s+in\s+demat)\b[^0-9]*$",
            )?,
            pan: PanFinder::new(FORMAT)?,
            folios: FolioSection::new(FORMAT)?,
        })
    }

    fn account_key(&self, line: &str) -> Option<AccountKey> {
        self.account
            .captures(line)
            .or_else(|| self.bo_account.captures(line))
            .map(|c| AccountKey {
                participant_id: c[1].to_string(),
                client_id: c[2].to_string(),
            })
    }

    fn category_heading(&self, line: &str) -> Option<String> {
        let heading = self.category.captures(line)?[1].to_ascii_lowercase();
        let label = if heading.starts_with("equity") {
            "Equity"
        } else if heading.starts_with("preference") {
            "Preference Shares"
        } else if heading.starts_with("bonds") {
            "Bonds"
        } else if heading.starts_with("debentures") {
            "Debentures"
        } else if heading.starts_with("government") {
            "Government Securities"
        } else if heading.starts_with("commercial") {
            "Commercial Paper"
        } else {
            "Mutual Fund"
        };
        Some(label.to_string())
    }
}

/// Category for a row with no section heading above it.
pub(crate) fn category_from_isin(isin: &str) -> &'static str {
    if isin.starts_with("INF") {
        "Mutual Fund"
    } else {
        DEFAULT_CATEGORY
    }
}

impl FormatExtractor for CdslExtractor {
    fn format(&self) -> FormatType {
        FORMAT
    }

    fn extract_investor_info(&self, text: &str) -> Result<InvestorInfo> {
        let name = text
            .lines()
            .find_map(|line| self.name.captures(line).map(|c| squash(&c[1])));
        let info = InvestorInfo {
            name,
            tax_id: self.pan.find(text),
            address: labelled_address(text),
        };
        require_investor(FORMAT, info)
    }

    fn extract_accounts(&self, text: &str) -> Result<Vec<ExtractedAccount>> {
        let mut accounts: Vec<ExtractedAccount> = Vec::new();
        for line in text.lines() {
            if let Some(key) = self.account_key(line) {
                if !accounts.iter().any(|a| a.key == key) {
                    accounts.push(ExtractedAccount {
                        depository: FORMAT,
                        key,
                    });
                }
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
            let quantity = row.figures.first().map(|q| clean_quantity(q)).unwrap_or_default();
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

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::error::{CasError, ErrorKind};

    const SAMPLE: &str = "\
Central Depository Services (India) Limited
CONSOLIDATED ACCOUNT STATEMENT
Name: ASHA RAO            PAN: ABCDE1234F
Address: 12 MG ROAD, INDIRANAGAR
BENGALURU 560038

DP Name: SAMPLE BROKING LTD   DP ID: 12345678 CLIENT ID: 87654321
EQUITY SHARES
ISIN Security Name Current Bal Market Price Value
INE002A01018 RELIANCE INDUSTRIES LTD 40 2,886.41 ₹1,15,456.40
INE009A01021 INFOSYS LIMITED 5 N/A
INF179K01BE2 HDFC TOP 100 FUND 12.5 800.00 10,000.00
Total 1,25,456.40
BO ID: 1234567811223344
INE062A01020 STATE BANK OF INDIA 10 ₹8,000.00
MUTUAL FUND FOLIOS
AMC: HDFC Mutual Fund    Folio No: 1234567/89
HDFC Balanced Advantage Fund 100.000 500.00 ₹50,000.00
";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn extractor() -> CdslExtractor {
        CdslExtractor::new().unwrap()
    }

    #[test]
    fn extracts_investor() {
        let info = extractor().extract_investor_info(SAMPLE).unwrap();
        assert_eq!(info.name.as_deref(), Some("ASHA RAO"));
        assert_eq!(info.tax_id.as_deref(), Some("ABCDE1234F"));
        assert_eq!(
            info.address.as_deref(),
            Some("12 MG ROAD, INDIRANAGAR, BENGALURU 560038")
        );
    }

    #[test]
    fn dp_name_is_not_investor_name() {
        let info = extractor()
            .extract_investor_info("CDSL\nDP Name: SAMPLE BROKING LTD\nPAN: ABCDE1234F")
            .unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.tax_id.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn missing_investor_is_incomplete() {
        let err = extractor()
            .extract_investor_info("CDSL\nDP ID: 12345678 CLIENT ID: 87654321")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionIncomplete);
        assert!(matches!(
            err,
            CasError::ExtractionIncomplete { section: "investor", .. }
        ));
    }

    #[test]
    fn extracts_dp_and_bo_accounts() {
        let accounts = extractor().extract_accounts(SAMPLE).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].key.participant_id, "12345678");
        assert_eq!(accounts[0].key.client_id, "87654321");
        assert_eq!(accounts[1].key.client_id, "11223344");
        assert_eq!(accounts[1].depository, FormatType::Cdsl);
    }

    #[test]
    fn extracts_holdings_with_categories() {
        let holdings = extractor().extract_holdings(SAMPLE).unwrap();
        assert_eq!(holdings.len(), 4);

        let reliance = &holdings[0];
        assert_eq!(reliance.security_id, "INE002A01018");
        assert_eq!(reliance.name, "RELIANCE INDUSTRIES LTD");
        assert_eq!(reliance.quantity, dec("40"));
        assert_eq!(reliance.current_value, dec("115456.40"));
        assert_eq!(reliance.category, "Equity");
        assert_eq!(reliance.account.as_ref().unwrap().client_id, "87654321");

        let sbi = &holdings[3];
        assert_eq!(sbi.category, "Other");
        assert_eq!(sbi.account.as_ref().unwrap().client_id, "11223344");
    }

    #[test]
    fn malformed_value_becomes_zero() {
        let holdings = extractor().extract_holdings(SAMPLE).unwrap();
        let infosys = &holdings[1];
        assert_eq!(infosys.name, "INFOSYS LIMITED");
        assert_eq!(infosys.quantity, dec("5"));
        assert_eq!(infosys.current_value, Decimal::ZERO);
        assert_eq!(holdings[2].security_id, "INF179K01BE2");
    }

    #[test]
    fn holding_without_figures_is_kept_at_zero() {
        let text = "DP ID: 12345678 CLIENT ID: 87654321\n\
                    INE009A01021 INFOSYS LIMITED N/A\n\
                    INE002A01018 RELIANCE INDUSTRIES LTD 1000.00\n";
        let holdings = extractor().extract_holdings(text).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].security_id, "INE009A01021");
        assert_eq!(holdings[0].name, "INFOSYS LIMITED");
        assert_eq!(holdings[0].quantity, Decimal::ZERO);
        assert_eq!(holdings[0].current_value, Decimal::ZERO);
        assert_eq!(holdings[1].current_value, dec("1000"));
    }

    #[test]
    fn folio_rows_are_not_holdings() {
        let holdings = extractor().extract_holdings(SAMPLE).unwrap();
        assert!(holdings.iter().all(|h| h.name != "HDFC Balanced Advantage Fund"));

        let funds = extractor().extract_funds(SAMPLE).unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].schemes[0].current_value, dec("50000"));
    }

    #[test]
    fn holdings_without_account_are_incomplete() {
        let text = "CDSL\nName: A B\nINE002A01018 RELIANCE 1 100.00\n";
        let err = extractor().extract(text).unwrap_err();
        assert!(matches!(
            err,
            CasError::ExtractionIncomplete { section: "accounts", .. }
        ));
    }
}
