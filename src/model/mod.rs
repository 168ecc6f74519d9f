//! Data model for case queries and extracted case data
//!
//! # Components
//!
//! - `CaseQuery`: validated input for one lookup
//! - `CaptchaToken`: the CAPTCHA value read from one search page load
//! - `RawCaseRow` / `OrderLink`: what the parsers extract from the portal
//! - `CaseRecord`: the assembled result returned to callers

mod query;
mod record;

pub use query::{CaseQuery, QueryError, MIN_FILING_YEAR};
pub use record::{CaseDate, CaseRecord, OrderLink, RawCaseRow, ResolutionWarning};

/// CAPTCHA value extracted from a freshly loaded search page
///
/// Tokens belong to the session and page load they were read from and are
/// never reused across queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaToken {
    pub value: String,
}
