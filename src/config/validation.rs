use crate::config::types::{AuditConfig, Config, PortalConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_audit_config(&config.audit)?;
    Ok(())
}

/// Validates portal configuration
///
/// Exposed so library callers that build a `PortalConfig` in code get the
/// same checks as a loaded file.
pub fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    if !config.search_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "search_path must start with '/', got '{}'",
            config.search_path
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_timeout("request_timeout_secs", config.request_timeout_secs)?;
    validate_timeout("connect_timeout_secs", config.connect_timeout_secs)?;

    if config.max_order_pages < 1 || config.max_order_pages > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_order_pages must be between 1 and 1000, got {}",
            config.max_order_pages
        )));
    }

    Ok(())
}

/// Validates audit configuration
fn validate_audit_config(config: &AuditConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.database_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database_path cannot be empty".to_string(),
            ));
        }
    }

    match &config.host {
        Some(host) => {
            if config.database_path.is_some() {
                return Err(ConfigError::Validation(
                    "audit takes either database_path or host, not both".to_string(),
                ));
            }
            if host.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "audit host cannot be empty".to_string(),
                ));
            }
            if config.port == 0 {
                return Err(ConfigError::Validation(
                    "audit port cannot be 0".to_string(),
                ));
            }
            for (name, value) in [("database", &config.database), ("user", &config.user)] {
                if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    return Err(ConfigError::Validation(format!(
                        "audit {} cannot be empty",
                        name
                    )));
                }
            }
        }
        None => {
            if config.database.is_some() || config.user.is_some() || config.password.is_some() {
                return Err(ConfigError::Validation(
                    "audit database, user and password require host".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_timeout(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < 1 || secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 300 seconds, got {}",
            name, secs
        )));
    }
    Ok(())
}
