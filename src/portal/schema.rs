//! The portal's markup contract
//!
//! Everything the extraction pipeline assumes about the site's HTML lives
//! here: element ids, expected table headers, result markers. A rename on the
//! site side should only ever require edits to this file.

/// Case-type `<select>` on the search page
pub const CASE_TYPE_SELECT: &str = "#case_type";

/// Case-number input
pub const CASE_NUMBER_INPUT: &str = "#case_number";

/// Filing-year control (a `<select>` on the live site)
pub const CASE_YEAR_INPUT: &str = "#case_year";

/// Element whose text is the CAPTCHA value
pub const CAPTCHA_DISPLAY: &str = "#captcha-code";

/// Input the CAPTCHA value is typed into
pub const CAPTCHA_INPUT: &str = "#captchaInput";

/// Submit control of the search form
pub const SUBMIT_CONTROL: &str = "#search";

/// Id the site gives both the results table and the orders table
pub const CASE_TABLE: &str = "table#caseTable";

/// Error banners shown above a redisplayed search form
///
/// Field hints such as `.invalid-feedback` are static markup on the form and
/// do not count.
pub const ERROR_BANNER: &str = ".alert-danger, .alert-error, #captcha-error";

/// Lowercased page text that means the search matched nothing
pub const NO_RECORD_MARKERS: &[&str] = &[
    "no data available",
    "no such record",
    "case not found",
    "no record found",
    "no records found",
];

/// Link texts of a pagination "next" control
pub const NEXT_PAGE_LABELS: &[&str] = &["next", "next page", "next »", "›", "»", ">", ">>"];

/// Listing-cell value meaning "no date set"
pub const NOT_AVAILABLE_VALUES: &[&str] = &["na", "n/a", "-", "--"];

/// Columns of the case-status results table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultColumn {
    Serial,
    FilingDate,
    NextHearing,
    CaseNumber,
    Parties,
    Listing,
}

/// Columns of the orders/judgments table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderColumn {
    Date,
    Document,
}

/// How a column is recognized from its header text
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec<C> {
    pub column: C,
    /// Lowercased fragments, any of which identifies the header
    pub keywords: &'static [&'static str],
    pub required: bool,
}

/// Results table schema
///
/// Specs are matched in order and each header is claimed at most once, so
/// the narrow date columns come before the broad case-number and listing
/// columns.
pub const RESULT_COLUMNS: &[ColumnSpec<ResultColumn>] = &[
    ColumnSpec {
        column: ResultColumn::Serial,
        keywords: &["s.no", "s. no", "sr.no", "sr. no", "serial"],
        required: false,
    },
    ColumnSpec {
        column: ResultColumn::FilingDate,
        keywords: &["filing date", "date of filing"],
        required: false,
    },
    ColumnSpec {
        column: ResultColumn::NextHearing,
        keywords: &["next hearing", "next date"],
        required: false,
    },
    ColumnSpec {
        column: ResultColumn::CaseNumber,
        keywords: &["case no", "diary no"],
        required: true,
    },
    ColumnSpec {
        column: ResultColumn::Parties,
        keywords: &["petitioner", "parties"],
        required: true,
    },
    ColumnSpec {
        column: ResultColumn::Listing,
        keywords: &["listing", "court no"],
        required: true,
    },
];

/// Orders table schema
pub const ORDER_COLUMNS: &[ColumnSpec<OrderColumn>] = &[
    ColumnSpec {
        column: OrderColumn::Date,
        keywords: &["date"],
        required: false,
    },
    ColumnSpec {
        column: OrderColumn::Document,
        keywords: &["order", "judgment", "judgement", "link", "case no"],
        required: true,
    },
];

/// Header text -> column position, as resolved against a concrete table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap<C> {
    positions: Vec<(C, usize)>,
}

impl<C: Copy + PartialEq> ColumnMap<C> {
    /// Position of `column` in the table, if the table has it
    pub fn position(&self, column: C) -> Option<usize> {
        self.positions
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, index)| *index)
    }
}

/// Resolves header texts against a schema
///
/// Returns the keywords of every required column that no header matched
/// when the table does not fit the schema.
pub fn match_columns<C: Copy + PartialEq>(
    headers: &[String],
    specs: &[ColumnSpec<C>],
) -> Result<ColumnMap<C>, Vec<&'static str>> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut claimed = vec![false; normalized.len()];
    let mut positions = Vec::new();
    let mut missing = Vec::new();

    for spec in specs {
        let found = normalized.iter().enumerate().position(|(index, header)| {
            !claimed[index] && spec.keywords.iter().any(|k| header.contains(k))
        });

        match found {
            Some(index) => {
                claimed[index] = true;
                positions.push((spec.column, index));
            }
            None if spec.required => missing.push(spec.keywords[0]),
            None => {}
        }
    }

    if missing.is_empty() {
        Ok(ColumnMap { positions })
    } else {
        Err(missing)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether lowercased page text carries a no-records marker
pub fn has_no_record_marker(page_text: &str) -> bool {
    let text = page_text.to_lowercase();
    NO_RECORD_MARKERS.iter().any(|marker| text.contains(marker))
}
