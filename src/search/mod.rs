//! Case search orchestration
//!
//! `CaseSearcher` runs one query end to end on its own portal session:
//!
//! 1. Validate the query (no network call for bad input)
//! 2. Submit the search form with a freshly read CAPTCHA
//! 3. Classify and parse the results table
//! 4. Resolve each matched case's order links
//! 5. Assemble the `CaseRecord`
//!
//! Exactly one audit entry is queued per call, whatever the outcome, a
//! dropped (cancelled or timed-out) call included.

mod assembler;

pub use assembler::assemble_record;

use crate::audit::{open_sink, AuditError, QueryAuditEntry, QueryAuditLogger};
use crate::config::{Config, PortalConfig};
use crate::model::{CaseQuery, CaseRecord};
use crate::portal::{
    list_case_types, load_search_page, parse_results, resolve_order_links, submit_search,
    OrderResolution, PortalSession,
};
use crate::{PortalError, SearchError};
use chrono::Utc;
use url::Url;

/// How many matched rows a search turns into records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchScope {
    First,
    All,
}

/// Entry point for case-status lookups
///
/// Cheap to share: each call opens its own `PortalSession`, so independent
/// queries may run concurrently.
#[derive(Debug, Clone)]
pub struct CaseSearcher {
    portal: PortalConfig,
    audit: QueryAuditLogger,
}

impl CaseSearcher {
    pub fn new(portal: PortalConfig, audit: QueryAuditLogger) -> Self {
        Self { portal, audit }
    }

    /// Builds a searcher writing to the configured audit store
    pub fn from_config(config: &Config) -> Result<Self, AuditError> {
        let sink = open_sink(&config.audit)?;
        Ok(Self::new(config.portal.clone(), QueryAuditLogger::new(sink)?))
    }

    pub fn portal_config(&self) -> &PortalConfig {
        &self.portal
    }

    /// Looks up one case
    ///
    /// When the portal lists several matching rows, the first is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(CaseRecord)` - The case with its order links
    /// * `Err(SearchError)` - See [`SearchError`] for the failure kinds
    pub async fn search(&self, query: CaseQuery) -> Result<CaseRecord, SearchError> {
        let records = self.run(query, MatchScope::First).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Internal("search produced no record".to_string()))
    }

    /// Looks up a case and returns every row the portal lists for it
    pub async fn search_all(&self, query: CaseQuery) -> Result<Vec<CaseRecord>, SearchError> {
        self.run(query, MatchScope::All).await
    }

    /// Waits until every audit entry queued so far has been written
    ///
    /// Call before exiting the process; entries still queued are lost
    /// otherwise.
    pub async fn flush_audit(&self) {
        self.audit.flush().await;
    }

    /// Case types offered by the portal's search form
    pub async fn list_case_types(&self) -> Result<Vec<String>, SearchError> {
        let session = PortalSession::open(&self.portal)?;
        Ok(list_case_types(&session).await?)
    }

    async fn run(
        &self,
        query: CaseQuery,
        scope: MatchScope,
    ) -> Result<Vec<CaseRecord>, SearchError> {
        tracing::info!("Searching {}", query);

        let mut audit = AttemptAudit::new(self.audit.clone(), query.clone());
        let outcome = self.execute(&query, scope, &mut audit.raw_html).await;

        match &outcome {
            Ok(records) => tracing::info!(
                "Found {} record(s) for {} ({} order links)",
                records.len(),
                query,
                records.iter().map(|r| r.order_links.len()).sum::<usize>()
            ),
            Err(SearchError::NotFound { .. }) => tracing::info!("No case found for {}", query),
            Err(e) => tracing::warn!("Search for {} failed ({}): {}", query, e.kind(), e),
        }

        audit.finish(&outcome);
        outcome
    }

    async fn execute(
        &self,
        query: &CaseQuery,
        scope: MatchScope,
        raw_html: &mut Option<String>,
    ) -> Result<Vec<CaseRecord>, SearchError> {
        query.validate()?;

        let session = PortalSession::open(&self.portal)?;
        let search_page = load_search_page(&session).await?;
        *raw_html = Some(search_page.body.clone());

        let response = submit_search(&session, &search_page, query).await?;
        *raw_html = Some(response.html.clone());

        if !response.found()? {
            return Err(SearchError::NotFound {
                query: query.to_string(),
            });
        }

        let rows = parse_results(&response.html, &response.url)?;
        if rows.is_empty() {
            return Err(SearchError::NotFound {
                query: query.to_string(),
            });
        }

        let wanted = match scope {
            MatchScope::First => 1,
            MatchScope::All => rows.len(),
        };

        let mut records = Vec::with_capacity(wanted);
        for row in rows.into_iter().take(wanted) {
            let resolution = match row.case_detail_url.as_deref() {
                Some(detail_url) => {
                    let detail_url = Url::parse(detail_url).map_err(PortalError::from)?;
                    resolve_order_links(&session, &detail_url, self.portal.max_order_pages).await?
                }
                None => {
                    tracing::debug!("Row for {} has no orders link", query);
                    OrderResolution::default()
                }
            };
            records.push(assemble_record(query, row, resolution, Utc::now()));
        }

        Ok(records)
    }
}

/// The audit entry of one query attempt
///
/// `finish` queues the entry for the attempt's outcome. Dropped unfinished,
/// when the search future is cancelled, it queues a cancelled entry instead.
struct AttemptAudit {
    logger: QueryAuditLogger,
    query: CaseQuery,
    raw_html: Option<String>,
    finished: bool,
}

impl AttemptAudit {
    fn new(logger: QueryAuditLogger, query: CaseQuery) -> Self {
        Self {
            logger,
            query,
            raw_html: None,
            finished: false,
        }
    }

    fn finish<T>(mut self, outcome: &Result<T, SearchError>) {
        self.finished = true;
        let entry = QueryAuditEntry::from_outcome(
            self.query.clone(),
            self.raw_html.take(),
            outcome,
            Utc::now(),
        );
        self.logger.record(entry);
    }
}

impl Drop for AttemptAudit {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        tracing::warn!("Search for {} dropped before completion", self.query);
        self.logger.record(QueryAuditEntry::cancelled(
            self.query.clone(),
            self.raw_html.take(),
            Utc::now(),
        ));
    }
}
