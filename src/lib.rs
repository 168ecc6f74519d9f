//! case-status: case-status retrieval for the Delhi High Court portal
//!
//! This crate drives the portal's case-status search form, extracts case
//! metadata and order/judgment document links from the returned HTML, and
//! keeps an append-only audit log of every query attempt.

pub mod audit;
pub mod config;
pub mod model;
pub mod portal;
pub mod search;

use thiserror::Error;

/// Errors returned to callers of [`search::CaseSearcher`]
///
/// Input and not-found errors are safe to show to end users as-is. Every
/// other variant carries operator detail that belongs in logs and the audit
/// table only; use [`SearchError::user_message`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No case found for {query}")]
    NotFound { query: String },

    #[error("Site unreachable: {detail}")]
    SiteUnreachable { detail: String },

    #[error("CAPTCHA rejected: {detail}")]
    CaptchaRejected { detail: String },

    #[error("Unexpected page structure: {detail}")]
    UnexpectedPageStructure { detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Short machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::SiteUnreachable { .. } => "site_unreachable",
            Self::CaptchaRejected { .. } => "captcha_rejected",
            Self::UnexpectedPageStructure { .. } => "unexpected_page_structure",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message suitable for end users
    ///
    /// Upstream, structural and internal failures get a generic message so
    /// selector and markup details never reach the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(reason) => format!("Please check your search: {}.", reason),
            Self::NotFound { query } => format!(
                "No case matching {} was found. Check the case type, number and year.",
                query
            ),
            Self::SiteUnreachable { .. } => {
                "The court website could not be reached. Please try again later.".to_string()
            }
            Self::CaptchaRejected { .. }
            | Self::UnexpectedPageStructure { .. }
            | Self::Internal(_) => {
                "The case status could not be retrieved. Please try again, or contact support if the problem persists.".to_string()
            }
        }
    }

    /// Whether the caller may reasonably retry the same query
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SiteUnreachable { .. })
    }
}

impl From<model::QueryError> for SearchError {
    fn from(err: model::QueryError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<PortalError> for SearchError {
    fn from(err: PortalError) -> Self {
        let detail = err.to_string();
        match err {
            PortalError::Unreachable { .. }
            | PortalError::Timeout { .. }
            | PortalError::HttpStatus { .. } => Self::SiteUnreachable { detail },
            PortalError::CaptchaRejected { .. } => Self::CaptchaRejected { detail },
            PortalError::CaptchaUnavailable | PortalError::UnexpectedPageStructure { .. } => {
                Self::UnexpectedPageStructure { detail }
            }
            PortalError::UnknownCaseType(_) => Self::InvalidInput(detail),
            PortalError::Client(_) | PortalError::UrlParse(_) => Self::Internal(detail),
        }
    }
}

/// Failures while talking to the portal or reading its pages
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Portal unreachable at {url}: {source}")]
    Unreachable { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("CAPTCHA display element missing or empty")]
    CaptchaUnavailable,

    #[error("Search form redisplayed with error: {banner}")]
    CaptchaRejected { banner: String },

    #[error("Case type '{0}' is not offered by the portal")]
    UnknownCaseType(String),

    #[error("Unexpected page structure at {url}: {message}")]
    UnexpectedPageStructure { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

impl PortalError {
    pub(crate) fn structure(url: &::url::Url, message: impl Into<String>) -> Self {
        Self::UnexpectedPageStructure {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for portal operations
pub type PortalResult<T> = std::result::Result<T, PortalError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CaseQuery, CaseRecord, OrderLink};
pub use search::CaseSearcher;
