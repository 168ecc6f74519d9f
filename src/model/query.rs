//! Case query definitions and input validation
//!
//! A query is validated when it is built, and again by the searcher, so
//! nothing touches the network with a malformed query.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::fmt;

/// Earliest filing year accepted by the portal's year selector
pub const MIN_FILING_YEAR: u16 = 1900;

/// A single case-status lookup: case type, case number and filing year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseQuery {
    /// Case type as listed in the portal's dropdown, e.g. `W.P.(C)`
    pub case_type: String,

    /// Case number within the type and year
    pub case_number: String,

    /// Four-digit filing year
    pub filing_year: u16,
}

/// Reasons a query is rejected before submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("case type is required")]
    MissingCaseType,

    #[error("case number is required")]
    MissingCaseNumber,

    #[error("case number '{0}' must contain only letters and digits")]
    InvalidCaseNumber(String),

    #[error("filing year {year} must be between {min} and {max}")]
    FilingYearOutOfRange { year: u16, min: u16, max: u16 },
}

impl CaseQuery {
    /// Builds a validated query, trimming surrounding whitespace
    ///
    /// # Example
    ///
    /// ```
    /// use case_status::model::CaseQuery;
    ///
    /// let query = CaseQuery::new(" W.P.(C) ", "1234", 2023).unwrap();
    /// assert_eq!(query.case_type, "W.P.(C)");
    /// assert!(CaseQuery::new("W.P.(C)", "", 2023).is_err());
    /// ```
    pub fn new(
        case_type: impl Into<String>,
        case_number: impl Into<String>,
        filing_year: u16,
    ) -> Result<Self, QueryError> {
        let query = Self {
            case_type: case_type.into().trim().to_string(),
            case_number: case_number.into().trim().to_string(),
            filing_year,
        };
        query.validate()?;
        Ok(query)
    }

    /// Checks the query invariants
    ///
    /// Public fields allow a query to be built by hand, so the searcher
    /// re-runs this before anything is submitted.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.case_type.trim().is_empty() {
            return Err(QueryError::MissingCaseType);
        }

        let number = self.case_number.trim();
        if number.is_empty() {
            return Err(QueryError::MissingCaseNumber);
        }
        if !number.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(QueryError::InvalidCaseNumber(number.to_string()));
        }

        let max = max_filing_year();
        if self.filing_year < MIN_FILING_YEAR || self.filing_year > max {
            return Err(QueryError::FilingYearOutOfRange {
                year: self.filing_year,
                min: MIN_FILING_YEAR,
                max,
            });
        }

        Ok(())
    }
}

impl fmt::Display for CaseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.case_type, self.case_number, self.filing_year)
    }
}

fn max_filing_year() -> u16 {
    u16::try_from(Utc::now().year()).unwrap_or(u16::MAX)
}
