//! Configuration module for case-status
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use case_status::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("case-status.toml")).unwrap();
//! println!("Searching against: {}", config.portal.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AuditBackend, AuditConfig, Config, PortalConfig, PostgresSettings};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate_portal_config;
