//! Case record assembly

use crate::model::{CaseDate, CaseQuery, CaseRecord, RawCaseRow};
use crate::portal::OrderResolution;
use chrono::{DateTime, Utc};

/// Merges a results row and its resolved order links into a `CaseRecord`
///
/// Pure and infallible: absent fields stay absent, and date text that does
/// not match a known format is kept as `CaseDate::Raw`.
pub fn assemble_record(
    query: &CaseQuery,
    row: RawCaseRow,
    resolution: OrderResolution,
    fetched_at: DateTime<Utc>,
) -> CaseRecord {
    CaseRecord {
        query: query.clone(),
        serial_number: row.serial_number,
        case_number_text: row.case_number_text,
        parties: row.parties_text,
        filing_date: row.filing_date.as_deref().map(CaseDate::from_text),
        next_hearing_date: row.next_hearing_date.as_deref().map(CaseDate::from_text),
        court_number: row.court_number,
        listing_text: row.listing_text,
        case_detail_url: row.case_detail_url,
        order_links: resolution.links,
        warnings: resolution.warnings,
        fetched_at,
    }
}
