//! Results table parsing
//!
//! Turns a search results page into `RawCaseRow`s. The table is recognized by
//! its headers rather than its styling, and column positions come from the
//! headers too, so cosmetic markup changes do not break extraction. A page
//! whose tables do not fit the schema is a structural error, never an empty
//! result.

use crate::model::RawCaseRow;
use crate::portal::dom::{
    element_text, is_placeholder_row, resolve_href, select_first, select_within, table_layout,
};
use crate::portal::schema::{
    match_columns, ColumnMap, ResultColumn, CASE_TABLE, NOT_AVAILABLE_VALUES, RESULT_COLUMNS,
};
use crate::{PortalError, PortalResult};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

/// Parses every case row of a results page, in document order
///
/// # Arguments
///
/// * `html` - The results page HTML
/// * `page_url` - URL the page was served from, for resolving detail links
///
/// # Returns
///
/// * `Ok(Vec<RawCaseRow>)` - Rows of the first table that fits the schema
/// * `Err(PortalError::UnexpectedPageStructure)` - No table fits the schema
pub fn parse_results(html: &str, page_url: &Url) -> PortalResult<Vec<RawCaseRow>> {
    let document = Html::parse_document(html);

    let tables = select_within(document.root_element(), "table");
    if tables.is_empty() {
        return Err(PortalError::structure(page_url, "no table on results page"));
    }

    // Prefer the table with the known id, then any table whose headers fit
    let preferred = select_first(&document, CASE_TABLE);
    let candidates = preferred.into_iter().chain(tables.iter().copied());

    let mut first_mismatch = None;
    for table in candidates {
        let layout = table_layout(table);
        match match_columns(&layout.headers, RESULT_COLUMNS) {
            Ok(columns) => {
                let rows = layout
                    .rows
                    .iter()
                    .filter(|cells| !is_placeholder_row(cells))
                    .map(|cells| parse_row(cells, &columns, page_url))
                    .collect();
                return Ok(rows);
            }
            Err(missing) => {
                first_mismatch.get_or_insert((layout.headers, missing));
            }
        }
    }

    let message = match first_mismatch {
        Some((headers, missing)) => format!(
            "results table headers {:?} are missing expected columns {:?}",
            headers, missing
        ),
        None => "no results table found".to_string(),
    };
    Err(PortalError::structure(page_url, message))
}

fn parse_row(
    cells: &[ElementRef<'_>],
    columns: &ColumnMap<ResultColumn>,
    page_url: &Url,
) -> RawCaseRow {
    let cell = |column| columns.position(column).and_then(|i| cells.get(i).copied());
    let text = |column| cell(column).and_then(element_text);

    let listing_text = text(ResultColumn::Listing);
    let fields = listing_text
        .as_deref()
        .map(listing_fields)
        .unwrap_or_default();

    let filing_date = text(ResultColumn::FilingDate)
        .and_then(available)
        .or_else(|| listing_filing_date(&fields));

    let next_hearing_date = text(ResultColumn::NextHearing)
        .and_then(available)
        .or_else(|| listing_value(&fields, ListingLabel::NextDate));

    RawCaseRow {
        serial_number: text(ResultColumn::Serial),
        case_number_text: text(ResultColumn::CaseNumber).map(|t| strip_orders_label(&t)),
        parties_text: text(ResultColumn::Parties),
        filing_date,
        next_hearing_date,
        court_number: listing_value(&fields, ListingLabel::CourtNumber),
        listing_text,
        case_detail_url: cell(ResultColumn::CaseNumber)
            .and_then(|c| orders_link(c, page_url))
            .map(String::from),
    }
}

/// The "Orders" anchor of a case-number cell, else its first anchor
fn orders_link(cell: ElementRef<'_>, page_url: &Url) -> Option<Url> {
    let anchors = select_within(cell, "a[href]");

    let orders = anchors.iter().find(|a| {
        element_text(**a).is_some_and(|t| t.to_lowercase().contains("orders"))
    });

    orders
        .or(anchors.first())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_href(href, page_url))
}

/// The case-number cell carries the "Orders" link text after the number
fn strip_orders_label(text: &str) -> String {
    let trimmed = text.trim_end();
    match trimmed.len().checked_sub("orders".len()) {
        Some(cut)
            if trimmed.is_char_boundary(cut)
                && trimmed[cut..].eq_ignore_ascii_case("orders") =>
        {
            trimmed[..cut].trim_end().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Labels the listing cell packs its values behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingLabel {
    NextDate,
    FilingDate,
    LastDate,
    CourtNumber,
}

fn listing_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(next\s+(?:hearing\s+)?date)|(filing\s+date|date\s+of\s+filing)|(last\s+date)|(court\s+no\.?))\s*:",
        )
        .expect("listing label pattern is valid")
    })
}

/// Splits a listing cell into labelled values
///
/// A value runs from its label to the next label or the end of the cell, so
/// dates written with spaces ("12 Aug 2024") stay whole. Placeholder values
/// are dropped.
fn listing_fields(listing: &str) -> Vec<(ListingLabel, String)> {
    let labels: Vec<(ListingLabel, usize, usize)> = listing_label_pattern()
        .captures_iter(listing)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = if caps.get(1).is_some() {
                ListingLabel::NextDate
            } else if caps.get(2).is_some() {
                ListingLabel::FilingDate
            } else if caps.get(3).is_some() {
                ListingLabel::LastDate
            } else {
                ListingLabel::CourtNumber
            };
            Some((label, whole.start(), whole.end()))
        })
        .collect();

    labels
        .iter()
        .enumerate()
        .filter_map(|(index, &(label, _, value_start))| {
            let value_end = labels
                .get(index + 1)
                .map_or(listing.len(), |&(_, next_start, _)| next_start);
            let value = listing[value_start..value_end]
                .trim()
                .trim_end_matches(|c| matches!(c, ',' | ';' | '|'))
                .to_string();
            available(value).map(|value| (label, value))
        })
        .collect()
}

fn listing_value(fields: &[(ListingLabel, String)], label: ListingLabel) -> Option<String> {
    fields
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, value)| value.clone())
}

/// An explicit filing-date label, else "Last Date"
///
/// The live site shows the last listing date where other portals show the
/// filing date.
fn listing_filing_date(fields: &[(ListingLabel, String)]) -> Option<String> {
    listing_value(fields, ListingLabel::FilingDate)
        .or_else(|| listing_value(fields, ListingLabel::LastDate))
}

/// Drops "NA"-style placeholders
fn available(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || NOT_AVAILABLE_VALUES
            .iter()
            .any(|na| trimmed.eq_ignore_ascii_case(na))
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}
