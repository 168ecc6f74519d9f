use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for case-status
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portal: PortalConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Target portal and HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Scheme and host of the court portal
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the case-status search page, relative to `base_url`
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound for each page load, including the form submission (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Safety ceiling for orders-listing pagination
    #[serde(rename = "max-order-pages", default = "default_max_order_pages")]
    pub max_order_pages: usize,
}

impl PortalConfig {
    /// Builds a portal configuration with default tunables
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_path: default_search_path(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_order_pages: default_max_order_pages(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Audit log configuration
///
/// Setting `host` selects a PostgreSQL server; otherwise the log is a local
/// SQLite file. PostgreSQL settings left out fall back to the standard
/// `PGUSER` / `PGPASSWORD` / `PGDATABASE` environment variables.
#[derive(Clone, Deserialize)]
pub struct AuditConfig {
    /// Path to the SQLite audit database
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// PostgreSQL server host
    #[serde(default)]
    pub host: Option<String>,

    /// PostgreSQL server port
    #[serde(default = "default_postgres_port")]
    pub port: u16,

    /// PostgreSQL database name
    #[serde(default)]
    pub database: Option<String>,

    /// PostgreSQL user
    #[serde(default)]
    pub user: Option<String>,

    /// PostgreSQL password
    #[serde(default)]
    pub password: Option<String>,
}

impl AuditConfig {
    /// Which store the audit log is written to
    pub fn backend(&self) -> AuditBackend {
        match &self.host {
            Some(host) => AuditBackend::Postgres(PostgresSettings {
                host: host.clone(),
                port: self.port,
                database: self.database.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
            }),
            None => AuditBackend::Sqlite {
                path: PathBuf::from(
                    self.database_path
                        .clone()
                        .unwrap_or_else(default_database_path),
                ),
            },
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            host: None,
            port: default_postgres_port(),
            database: None,
            user: None,
            password: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("database_path", &self.database_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The audit store selected by an `AuditConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditBackend {
    Sqlite { path: PathBuf },
    Postgres(PostgresSettings),
}

impl fmt::Display for AuditBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite { path } => write!(f, "sqlite:{}", path.display()),
            Self::Postgres(settings) => write!(
                f,
                "postgres://{}{}:{}/{}",
                settings
                    .user
                    .as_deref()
                    .map(|u| format!("{}@", u))
                    .unwrap_or_default(),
                settings.host,
                settings.port,
                settings.database.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Connection settings for a PostgreSQL audit store
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_search_path() -> String {
    "/app/get-case-type-status".to_string()
}

fn default_user_agent() -> String {
    format!("case-status/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_order_pages() -> usize {
    50
}

fn default_database_path() -> String {
    "./case_status_audit.db".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}
