//! Per-query portal session
//!
//! A `PortalSession` owns its own HTTP client and cookie jar. One is opened
//! for each query and dropped when the query finishes, fails, or is
//! cancelled, so CAPTCHA state and cookies never leak between queries.

use crate::config::PortalConfig;
use crate::{PortalError, PortalResult};
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A page as returned by the portal
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// Final URL after redirects
    pub url: Url,
    /// Page body content
    pub body: String,
}

/// An explicitly scoped browsing session against the portal
#[derive(Debug)]
pub struct PortalSession {
    id: u64,
    client: Client,
    search_url: Url,
}

impl PortalSession {
    /// Opens a fresh session with an empty cookie jar
    ///
    /// No request is sent until the first page load.
    pub fn open(config: &PortalConfig) -> PortalResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let search_url = base_url.join(&config.search_path)?;
        let client = build_http_client(config).map_err(PortalError::Client)?;
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        tracing::debug!("Opened portal session {} for {}", id, search_url);

        Ok(Self {
            id,
            client,
            search_url,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// URL of the case-status search page
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Loads a page with GET
    pub async fn get(&self, url: &Url) -> PortalResult<LoadedPage> {
        self.load(self.client.get(url.clone()), url).await
    }

    /// Submits form fields as a GET query string
    pub async fn get_with_query(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> PortalResult<LoadedPage> {
        self.load(self.client.get(url.clone()).query(fields), url)
            .await
    }

    /// Submits form fields as an urlencoded POST body
    pub async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> PortalResult<LoadedPage> {
        self.load(self.client.post(url.clone()).form(fields), url)
            .await
    }

    async fn load(&self, request: RequestBuilder, url: &Url) -> PortalResult<LoadedPage> {
        tracing::debug!("Session {}: loading {}", self.id, url);

        let response = request
            .send()
            .await
            .map_err(|e| classify_error(e, url))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(PortalError::HttpStatus {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(e, url))?;

        Ok(LoadedPage {
            url: final_url,
            body,
        })
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        tracing::debug!("Closed portal session {}", self.id);
    }
}

/// Builds the session's HTTP client
///
/// Every request, the form submission included, is bounded by the
/// configured request timeout.
pub fn build_http_client(config: &PortalConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_error(error: reqwest::Error, url: &Url) -> PortalError {
    if error.is_timeout() {
        PortalError::Timeout {
            url: url.to_string(),
        }
    } else {
        PortalError::Unreachable {
            url: url.to_string(),
            source: error,
        }
    }
}
