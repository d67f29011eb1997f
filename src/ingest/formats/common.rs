//! Helpers shared by the per-issuer extractors.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CasError, Result, Stage};
use crate::models::format::FormatType;
use crate::models::statement::{InvestorInfo, MutualFundFolio, SchemeValuation};

/// Currency markers that may prefix an amount or stand alone as a column.
const CURRENCY_MARKERS: &[&str] = &["₹", "Rs.", "Rs", "INR"];

/// Category used when the statement gives no hint.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Compile a layout pattern, wrapping failures as internal extraction errors.
pub fn compile(format: FormatType, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        CasError::internal(format, Stage::EntityExtraction, format!("invalid pattern: {e}"))
    })
}

/// Strip a leading currency marker from a cell.
#[must_use]
pub fn strip_currency(cell: &str) -> &str {
    let cell = cell.trim();
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = cell.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    cell
}

fn clean_decimal(raw: &str) -> Option<Decimal> {
    let kept: String = strip_currency(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    Decimal::from_str(&kept).ok()
}

/// Parse a currency amount: 2 dp, never negative, zero when unparsable.
#[must_use]
pub fn clean_amount(raw: &str) -> Decimal {
    clean_decimal(raw)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or_default()
        .max(Decimal::ZERO)
}

/// Parse a unit/share count: 4 dp, zero when unparsable.
#[must_use]
pub fn clean_quantity(raw: &str) -> Decimal {
    clean_decimal(raw)
        .map(|d| d.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or_default()
}

/// True for cells such as `1,23,456.78`, `₹500` or `-12.5`.
#[must_use]
pub fn is_numeric_cell(cell: &str) -> bool {
    let cell = strip_currency(cell);
    !cell.is_empty()
        && cell.chars().any(|c| c.is_ascii_digit())
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
}

/// ISIN shape: two letters, nine alphanumerics, one check digit.
#[must_use]
pub fn is_isin(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 12
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..11]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        && bytes[11].is_ascii_digit()
}

/// A table row whose columns degraded to whitespace-separated cells.
///
/// The last cell is the value column, the numeric cells directly before it
/// are the remaining figure columns, everything earlier is the label.
#[derive(Debug, PartialEq, Eq)]
pub struct Row<'a> {
    pub label: Vec<&'a str>,
    pub figures: Vec<&'a str>,
    pub value: &'a str,
}

impl Row<'_> {
    #[must_use]
    pub fn label_text(&self) -> String {
        self.label.join(" ")
    }
}

/// Split cells into a [`Row`]. `None` when the row carries no figure at all.
#[must_use]
pub fn split_row<'a>(cells: &[&'a str]) -> Option<Row<'a>> {
    let cells: Vec<&str> = cells
        .iter()
        .copied()
        .filter(|c| !CURRENCY_MARKERS.contains(c))
        .collect();
    let (value, rest) = cells.split_last()?;
    let figure_start = rest
        .iter()
        .rposition(|c| !is_numeric_cell(c))
        .map_or(0, |i| i + 1);
    let figures = rest[figure_start..].to_vec();
    if figures.is_empty() && !is_numeric_cell(value) {
        return None;
    }
    Some(Row {
        label: rest[..figure_start].to_vec(),
        figures,
        value,
    })
}

/// Split the cells following an ISIN.
///
/// An ISIN marks the row as a holding, so unlike [`split_row`] a row with no
/// figures is kept: the last cell is its value and it has no quantity.
#[must_use]
pub fn holding_row<'a>(cells: &[&'a str]) -> Option<Row<'a>> {
    split_row(cells).or_else(|| {
        let cells: Vec<&str> = cells
            .iter()
            .copied()
            .filter(|c| !CURRENCY_MARKERS.contains(c))
            .collect();
        let (value, label) = cells.split_last()?;
        (!label.is_empty()).then(|| Row {
            label: label.to_vec(),
            figures: Vec::new(),
            value,
        })
    })
}

/// Return the text after `label:` on a line, case-insensitive.
///
/// The value stops at the next run of two or more spaces so side-by-side
/// fields in a degraded table do not bleed into each other.
#[must_use]
pub fn field_after<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = field_rest(line, label)?;
    let end = rest.find("  ").unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then_some(value)
}

/// Everything after `label:` to the end of the line.
#[must_use]
pub fn field_rest<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let lower = line.to_ascii_lowercase();
    let start = lower.find(&label.to_ascii_lowercase())? + label.len();
    let rest = line[start..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('-'))
        .unwrap_or(rest)
        .trim();
    (!rest.is_empty()).then_some(rest)
}

/// Collapse inner whitespace runs to single spaces.
#[must_use]
pub fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read an `Address:` block: the labelled line plus continuation lines up
/// to a blank line or the next labelled field.
#[must_use]
pub fn labelled_address(text: &str) -> Option<String> {
    const MAX_CONTINUATION: usize = 4;

    let mut lines = text.lines().map(str::trim);
    let first = lines.find(|l| l.to_ascii_lowercase().starts_with("address"))?;
    let mut parts: Vec<String> = field_rest(first, "address")
        .map(|v| squash(v.trim_end_matches(',')))
        .into_iter()
        .collect();
    for line in lines.take(MAX_CONTINUATION) {
        if line.is_empty() || line.contains(':') {
            break;
        }
        parts.push(squash(line.trim_end_matches(',')));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Fail when not a single investor field was found.
pub fn require_investor(format: FormatType, info: InvestorInfo) -> Result<InvestorInfo> {
    if info.is_empty() {
        Err(CasError::ExtractionIncomplete {
            format,
            section: "investor",
        })
    } else {
        Ok(info)
    }
}

/// Find a PAN anywhere after a `PAN` label.
pub struct PanFinder {
    re: Regex,
}

impl PanFinder {
    pub fn new(format: FormatType) -> Result<Self> {
        Ok(Self {
            re: compile(format, r"(?i:\bPAN\b)[^A-Za-z0-9]*([A-Z]{5}[0-9]{4}[A-Z])\b")?,
        })
    }

    #[must_use]
    pub fn find(&self, text: &str) -> Option<String> {
        self.re.captures(text).map(|c| c[1].to_string())
    }
}

/// Add a scheme to the folio list, merging repeated (AMC, folio) pairs.
pub fn push_scheme(
    folios: &mut Vec<MutualFundFolio>,
    amc: &str,
    folio_number: &str,
    scheme: SchemeValuation,
) {
    if let Some(folio) = folios
        .iter_mut()
        .find(|f| f.amc == amc && f.folio_number == folio_number)
    {
        folio.schemes.push(scheme);
    } else {
        folios.push(MutualFundFolio {
            amc: amc.to_string(),
            folio_number: folio_number.to_string(),
            schemes: vec![scheme],
        });
    }
}

/// Parser for the mutual-fund folio section depository statements append
/// after the demat holdings.
///
/// ```text
/// MUTUAL FUND FOLIOS
/// AMC: HDFC Mutual Fund    Folio No: 1234567/89
/// INF179K01BE2 HDFC Top 100 Fund - Growth  100.000  500.00  ₹50,000.00
/// ```
pub struct FolioSection {
    format: FormatType,
    start: Regex,
    end: Regex,
    amc: Regex,
    folio: Regex,
}

impl FolioSection {
    pub fn new(format: FormatType) -> Result<Self> {
        Ok(Self {
            format,
            start: compile(
                format,
                r"(?i)^\s*(mutual\s+fund\s+folios|mutual\s+fund\s+units\s+held\s+(as\s+on|with\s+amc|in\s+statement))",
            )?,
            end: compile(format, r"(?i)(\bDP\s*ID\b|^\s*(grand\s+total|portfolio\s+composition)\b)")?,
            amc: compile(format, r"(?i)\bAMC(?:\s+Name)?\s*[:\-]\s*(.+?)(?:\s{2,}|\s+Folio\b|$)")?,
            folio: compile(format, r"(?i)\bFolio\s*(?:No\.?|Number)?\s*[:\-]\s*([A-Za-z0-9/\-]+(?:\s*/\s*[A-Za-z0-9]+)?)")?,
        })
    }

    /// True for the heading that opens the folio section.
    #[must_use]
    pub fn is_start(&self, line: &str) -> bool {
        self.start.is_match(line.trim())
    }

    /// True for lines that close the folio section.
    #[must_use]
    pub fn is_end(&self, line: &str) -> bool {
        self.end.is_match(line.trim())
    }

    pub fn extract(&self, text: &str) -> Vec<MutualFundFolio> {
        let mut folios = Vec::new();
        let mut in_section = false;
        let mut amc: Option<String> = None;
        let mut folio: Option<String> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if self.start.is_match(trimmed) {
                in_section = true;
                continue;
            }
            if !in_section || trimmed.is_empty() {
                continue;
            }
            if self.end.is_match(trimmed) {
                in_section = false;
                amc = None;
                folio = None;
                continue;
            }

            let mut anchored = false;
            if let Some(c) = self.amc.captures(trimmed) {
                amc = Some(squash(&c[1]));
                folio = None;
                anchored = true;
            }
            if let Some(c) = self.folio.captures(trimmed) {
                folio = Some(c[1].replace(' ', ""));
                anchored = true;
            }
            if anchored || is_table_noise(trimmed) {
                continue;
            }

            let (Some(amc_name), Some(folio_no)) = (amc.as_deref(), folio.as_deref()) else {
                tracing::debug!(format = %self.format, line = trimmed, "scheme row outside a folio");
                continue;
            };
            let cells: Vec<&str> = trimmed.split_whitespace().collect();
            let (isin, cells) = match cells.split_first() {
                Some((first, rest)) if is_isin(first) => (Some((*first).to_string()), rest),
                _ => (None, &cells[..]),
            };
            let Some(row) = split_row(cells) else {
                continue;
            };
            let scheme_name = row.label_text();
            if scheme_name.is_empty() {
                continue;
            }
            let (units, nav) = match row.figures.as_slice() {
                [] => (None, None),
                [units] => (Some(clean_quantity(units)), None),
                [.., units, nav] => (Some(clean_quantity(units)), Some(clean_quantity(nav))),
            };
            push_scheme(
                &mut folios,
                amc_name,
                folio_no,
                SchemeValuation {
                    scheme_name,
                    isin,
                    units,
                    nav,
                    current_value: clean_amount(row.value),
                },
            );
        }
        folios
    }
}

/// Column headers, totals and page furniture inside tables.
#[must_use]
pub fn is_table_noise(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("total")
        || lower.starts_with("sub total")
        || lower.starts_with("isin")
        || lower.starts_with("scheme name")
        || lower.starts_with("page ")
        || lower.contains("security name")
}
