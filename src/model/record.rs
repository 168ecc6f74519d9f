//! Extracted and assembled case data
//!
//! `RawCaseRow` and `OrderLink` are what the parsers produce from the portal's
//! HTML; `CaseRecord` is the normalized unit handed back to callers.

use crate::model::CaseQuery;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Date formats the portal has been observed to use
const KNOWN_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d-%b-%Y",
];

/// A date cell from the portal
///
/// The site's date formatting is not stable, so text that does not match a
/// known format is kept verbatim instead of being coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CaseDate {
    Parsed(NaiveDate),
    Raw(String),
}

impl CaseDate {
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        KNOWN_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .map(Self::Parsed)
            .unwrap_or_else(|| Self::Raw(text.to_string()))
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Parsed(date) => Some(*date),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for CaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(date) => write!(f, "{}", date.format("%d/%m/%Y")),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// One row of the results table, as found
///
/// Every field is optional: a missing or blank cell leaves the field `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCaseRow {
    /// "S.No." cell text
    pub serial_number: Option<String>,
    /// "Diary No. / Case No." cell text
    pub case_number_text: Option<String>,
    pub parties_text: Option<String>,
    /// Whole listing cell, labels included
    pub listing_text: Option<String>,
    pub filing_date: Option<String>,
    pub next_hearing_date: Option<String>,
    pub court_number: Option<String>,
    /// Absolute URL of the case's orders listing
    pub case_detail_url: Option<String>,
}

/// A downloadable order or judgment document
///
/// Links are kept in (page_index, appearance) order. That this order also
/// reflects document recency is an assumption about the site, not something
/// the resolver checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLink {
    pub label: String,
    pub document_url: String,
    /// 1-based page of the orders listing the link was found on
    pub page_index: usize,
    /// Raw text of the row's date column, if the listing has one
    pub order_date: Option<String>,
}

/// Non-fatal conditions attached to an otherwise usable result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// Pagination was cut off at the page ceiling; links are partial
    PaginationLimitExceeded { pages_fetched: usize },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaginationLimitExceeded { pages_fetched } => write!(
                f,
                "orders listing truncated after {} pages; more pages were advertised",
                pages_fetched
            ),
        }
    }
}

/// The normalized result of one successful query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub query: CaseQuery,
    /// Position of the row in the portal's results table
    pub serial_number: Option<String>,
    pub case_number_text: Option<String>,
    pub parties: Option<String>,
    pub filing_date: Option<CaseDate>,
    pub next_hearing_date: Option<CaseDate>,
    pub court_number: Option<String>,
    /// Listing cell as shown, for labels the parser does not break out
    pub listing_text: Option<String>,
    pub case_detail_url: Option<String>,
    pub order_links: Vec<OrderLink>,
    pub warnings: Vec<ResolutionWarning>,
    pub fetched_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Whether the order links are known to be incomplete
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}
