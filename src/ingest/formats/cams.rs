//! Registrar (CAMS / KFintech) consolidated account statement layout.
//!
//! ```text
//! Email Id: asha.rao@example.com
//! ASHA RAO
//! 12 MG ROAD, BENGALURU 560038
//! HDFC Mutual Fund
//! Folio No: 1234567/89    KYC: OK  PAN: OK
//! B92Z-HDFC Top 100 Fund - Direct Growth (Advisor: DIRECT) Registrar : CAMS
//! Closing Unit Balance: 106.123  NAV on 31-Mar-2024: INR 850.25  Market Value on 31-Mar-2024: INR 90,231.08
//! ```
//!
//! Registrar statements list folios only; there are no demat accounts.

use regex::Regex;

use crate::error::Result;
use crate::ingest::formats::common::{
    clean_amount, clean_quantity, compile, is_table_noise, push_scheme, require_investor, squash,
    PanFinder,
};
use crate::ingest::formats::{ExtractedAccount, ExtractedHolding, FormatExtractor};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio, SchemeValuation};

const FORMAT: FormatType = FormatType::Cams;

/// Lines below the investor name that end the address block.
const ADDRESS_STOP_WORDS: &[&str] = &["mobile", "phone", "pan", "email"];

/// True when `line` opens with `word` as a whole word (`PAN:` but not `PANVEL`).
fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .map_or(true, |c| c == ':' || c.is_whitespace())
    })
}

pub struct CamsExtractor {
    name: Regex,
    amc: Regex,
    folio: Regex,
    scheme_code: Regex,
    scheme_tail: Regex,
    field_line: Regex,
    isin: Regex,
    closing_units: Regex,
    nav: Regex,
    value: Regex,
    pan: PanFinder,
}

/// A scheme whose valuation line has not been seen yet.
struct SchemeDraft {
    name: String,
    isin: Option<String>,
    units: Option<rust_decimal::Decimal>,
    nav: Option<rust_decimal::Decimal>,
}

impl CamsExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: compile(FORMAT, r"(?i)^\s*(?:investor\s+)?name\s*[:\-]\s*(.+?)(?:\s{2,}|$)")?,
            amc: compile(FORMAT, r"(?i)^([A-Za-z0-9&.,'()\- ]*?\bMutual\s+Fund)\s*$")?,
            folio: compile(
                FORMAT,
                r"(?i)\bFolio\s*(?:No\.?|Number)?\s*[:\-]\s*([A-Za-z0-9]+(?:\s*/\s*[A-Za-z0-9]+)?)",
            )?,
            scheme_code: compile(FORMAT, r"^[A-Z0-9]{2,8}\s*-\s*")?,
            scheme_tail: compile(
                FORMAT,
                r"(?i)\s*(?:\(\s*advisor\b.*|\(\s*non-demat\s*\).*|-?\s*ISIN\s*:.*|registrar\s*:.*)$",
            )?,
            field_line: compile(
                FORMAT,
                r"(?i)^(pan|kyc|nominee\s*\d*|isin|opening\s+unit\s+balance|date|registrar)\b",
            )?,
            isin: compile(FORMAT, r"(?i:\bISIN\b)\s*:\s*([A-Z]{2}[A-Z0-9]{9}[0-9])\b")?,
            closing_units: compile(FORMAT, r"(?i)closing\s+unit\s+balance\s*:\s*([0-9,]+(?:\.[0-9]+)?)")?,
            nav: compile(
                FORMAT,
                r"(?i)\bNAV\s+on\s+[^:]*:\s*(?:INR|Rs\.?|₹)?\s*([0-9,]+(?:\.[0-9]+)?)",
            )?,
            value: compile(
                FORMAT,
                r"(?i)\b(?:market\s+value|valuation)\s+on\s+[^:]*:\s*(?:INR|Rs\.?|₹)?\s*(\S+)",
            )?,
            pan: PanFinder::new(FORMAT)?,
        })
    }

    /// The investor block: first non-empty line after `Email Id`, then the
    /// address lines below it.
    fn investor_block(&self, text: &str) -> (Option<String>, Option<String>) {
        const MAX_ADDRESS_LINES: usize = 4;

        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let Some(email_at) = lines
            .iter()
            .position(|l| l.to_ascii_lowercase().starts_with("email id"))
        else {
            return (None, None);
        };

        let mut rest = lines[email_at + 1..].iter().skip_while(|l| l.is_empty());
        let name = rest
            .next()
            .filter(|l| !l.contains(':'))
            .map(|l| squash(l));
        if name.is_none() {
            return (None, None);
        }

        let address: Vec<String> = rest
            .take_while(|l| {
                let lower = l.to_ascii_lowercase();
                !l.is_empty() && !ADDRESS_STOP_WORDS.iter().any(|w| starts_with_word(&lower, w))
            })
            .take(MAX_ADDRESS_LINES)
            .map(|l| squash(l.trim_end_matches(',')))
            .collect();
        let address = (!address.is_empty()).then(|| address.join(", "));
        (name, address)
    }

    fn scheme_name(&self, line: &str) -> String {
        let without_code = self.scheme_code.replace(line, "");
        let without_tail = self.scheme_tail.replace(&without_code, "");
        squash(without_tail.trim_end_matches(['-', ' ']))
    }
}

impl FormatExtractor for CamsExtractor {
    fn format(&self) -> FormatType {
        FORMAT
    }

    fn extract_investor_info(&self, text: &str) -> Result<InvestorInfo> {
        let (block_name, address) = self.investor_block(text);
        let name = block_name.or_else(|| {
            text.lines()
                .find_map(|line| self.name.captures(line).map(|c| squash(&c[1])))
        });
        let info = InvestorInfo {
            name,
            tax_id: self.pan.find(text),
            address,
        };
        require_investor(FORMAT, info)
    }

    fn extract_accounts(&self, _text: &str) -> Result<Vec<ExtractedAccount>> {
        Ok(Vec::new())
    }

    fn extract_holdings(&self, _text: &str) -> Result<Vec<ExtractedHolding>> {
        Ok(Vec::new())
    }

    fn extract_funds(&self, text: &str) -> Result<Vec<MutualFundFolio>> {
        let mut folios = Vec::new();
        let mut amc: Option<String> = None;
        let mut folio: Option<String> = None;
        let mut awaiting_scheme = false;
        let mut draft: Option<SchemeDraft> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(c) = self.amc.captures(trimmed) {
                amc = Some(squash(&c[1]));
                folio = None;
                draft = None;
                awaiting_scheme = false;
                continue;
            }
            if let Some(c) = self.folio.captures(trimmed) {
                folio = Some(c[1].replace(' ', ""));
                draft = None;
                awaiting_scheme = true;
                continue;
            }
            if awaiting_scheme && !self.field_line.is_match(trimmed) && !is_table_noise(trimmed) {
                let name = self.scheme_name(trimmed);
                if !name.is_empty() {
                    draft = Some(SchemeDraft {
                        name,
                        isin: None,
                        units: None,
                        nav: None,
                    });
                    awaiting_scheme = false;
                }
            }

            let Some(current) = draft.as_mut() else {
                continue;
            };
            if let Some(c) = self.isin.captures(trimmed) {
                current.isin = Some(c[1].to_string());
            }
            if let Some(c) = self.closing_units.captures(trimmed) {
                current.units = Some(clean_quantity(&c[1]));
            }
            if let Some(c) = self.nav.captures(trimmed) {
                current.nav = Some(clean_quantity(&c[1]));
            }
            let Some(c) = self.value.captures(trimmed) else {
                continue;
            };
            let current_value = clean_amount(&c[1]);

            let Some(done) = draft.take() else {
                continue;
            };
            match (amc.as_deref(), folio.as_deref()) {
                (Some(amc_name), Some(folio_no)) => push_scheme(
                    &mut folios,
                    amc_name,
                    folio_no,
                    SchemeValuation {
                        scheme_name: done.name,
                        isin: done.isin,
                        units: done.units,
                        nav: done.nav,
                        current_value,
                    },
                ),
                _ => {
                    tracing::debug!(format = %FORMAT, scheme = %done.name, "valuation outside an AMC folio");
                }
            }
        }
        Ok(folios)
    }
}
