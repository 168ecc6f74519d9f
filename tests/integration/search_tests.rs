//! End-to-end search tests against a mock portal

use crate::common::*;
use case_status::audit::{
    AuditError, AuditRecord, AuditSink, AuditStatus, QueryAuditEntry, QueryAuditLogger,
};
use case_status::model::{CaseDate, CaseQuery};
use case_status::SearchError;
use case_status::CaseSearcher;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wp_query() -> CaseQuery {
    CaseQuery::new("W.P.(C)", "1234", 2023).unwrap()
}

/// Results for W.P.(C) 1234/2023 with a two-page orders listing
async fn mount_single_case(server: &MockServer) {
    let listing = "NEXT DATE: 12/08/2024 Last Date: 01/02/2024 COURT NO: 4";
    mount_search(
        server,
        results_page(&result_row(1234, "ALPHA LTD Vs. UNION OF INDIA", listing)),
    )
    .await;

    mount_page(
        server,
        "/app/case-orders/1234",
        orders_page(&["order-2024-08", "order-2024-05"], Some("/app/case-orders/1234/page/2")),
    )
    .await;
    mount_page(
        server,
        "/app/case-orders/1234/page/2",
        orders_page(&["judgment-2023-11"], None),
    )
    .await;
}

#[tokio::test]
async fn test_search_end_to_end() {
    let server = MockServer::start().await;
    mount_single_case(&server).await;
    let (searcher, log) = searcher(&server);

    let record = searcher.search(wp_query()).await.unwrap();

    assert_eq!(record.query, wp_query());
    assert_eq!(
        record.case_number_text.as_deref(),
        Some("W.P.(C) - 1234/2023 [PENDING]")
    );
    assert_eq!(record.parties.as_deref(), Some("ALPHA LTD Vs. UNION OF INDIA"));
    assert_eq!(
        record.next_hearing_date,
        Some(CaseDate::Parsed(NaiveDate::from_ymd_opt(2024, 8, 12).unwrap()))
    );
    assert_eq!(
        record.filing_date,
        Some(CaseDate::Parsed(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()))
    );
    assert_eq!(record.court_number.as_deref(), Some("4"));
    assert!(record.warnings.is_empty());

    let links: Vec<(&str, usize)> = record
        .order_links
        .iter()
        .map(|l| (l.label.as_str(), l.page_index))
        .collect();
    assert_eq!(
        links,
        vec![
            ("order-2024-08", 1),
            ("order-2024-05", 1),
            ("judgment-2023-11", 2)
        ]
    );
    assert_eq!(
        record.order_links[0].document_url,
        format!("{}/files/order-2024-08.pdf", server.uri())
    );

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Success);
    assert_eq!(entries[0].case_type, "W.P.(C)");
    assert_eq!(entries[0].case_number, "1234");
    assert_eq!(entries[0].filing_year, 2023);
    assert!(entries[0].raw_html.as_deref().unwrap().contains("caseTable"));
}

#[tokio::test]
async fn test_session_cookie_carries_to_submission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(search_page("")).insert_header("set-cookie", "portal_session=abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("cookie", "portal_session=abc"))
        .respond_with(html(no_records_page()))
        .expect(1)
        .mount(&server)
        .await;

    let (searcher, _log) = searcher(&server);
    let result = searcher.search(wp_query()).await;

    assert!(matches!(result, Err(SearchError::NotFound { .. })));
}

#[tokio::test]
async fn test_no_records_is_not_found() {
    let server = MockServer::start().await;
    mount_search(&server, no_records_page()).await;
    let (searcher, log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::NotFound { .. }));
    assert!(!err.is_retryable());

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::NotFound);
    assert!(entries[0].raw_html.is_some());
}

#[tokio::test]
async fn test_search_all_returns_every_row() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        result_row(1, "A Vs. B", "NEXT DATE: NA"),
        result_row(2, "C Vs. D", "NEXT DATE: 03/03/2025")
    );
    mount_search(&server, results_page(&rows)).await;
    mount_page(&server, "/app/case-orders/1", orders_page(&["first"], None)).await;
    mount_page(&server, "/app/case-orders/2", orders_page(&["second"], None)).await;
    let (searcher, log) = searcher(&server);

    let records = searcher.search_all(wp_query()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].parties.as_deref(), Some("A Vs. B"));
    assert_eq!(records[0].next_hearing_date, None);
    assert_eq!(records[1].order_links[0].label, "second");

    searcher.flush_audit().await;
    assert_eq!(log.count().unwrap(), 1);
}

#[tokio::test]
async fn test_search_resolves_only_first_row() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        result_row(1, "A Vs. B", "NEXT DATE: NA"),
        result_row(2, "C Vs. D", "NEXT DATE: NA")
    );
    mount_search(&server, results_page(&rows)).await;
    mount_page(&server, "/app/case-orders/1", orders_page(&["first"], None)).await;
    Mock::given(method("GET"))
        .and(path("/app/case-orders/2"))
        .respond_with(html(orders_page(&["second"], None)))
        .expect(0)
        .mount(&server)
        .await;
    let (searcher, _log) = searcher(&server);

    let record = searcher.search(wp_query()).await.unwrap();
    assert_eq!(record.parties.as_deref(), Some("A Vs. B"));
}

#[tokio::test]
async fn test_invalid_input_makes_no_request() {
    let server = MockServer::start().await;
    mount_search(&server, no_records_page()).await;
    let (searcher, log) = searcher(&server);

    let query = CaseQuery {
        case_type: "W.P.(C)".to_string(),
        case_number: String::new(),
        filing_year: 2023,
    };
    let err = searcher.search(query).await.unwrap_err();

    assert!(matches!(err, SearchError::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap().is_empty());

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0]
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("invalid_input"));
    assert_eq!(entries[0].raw_html, None);
}

#[tokio::test]
async fn test_unknown_case_type_is_invalid_input() {
    let server = MockServer::start().await;
    mount_search(&server, no_records_page()).await;
    let (searcher, _log) = searcher(&server);

    let query = CaseQuery::new("XYZ", "1", 2020).unwrap();
    let err = searcher.search(query).await.unwrap_err();

    assert!(matches!(err, SearchError::InvalidInput(_)));
}

#[tokio::test]
async fn test_captcha_rejected() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        search_page(r#"<div class="alert alert-danger">Invalid Captcha</div>"#),
    )
    .await;
    let (searcher, log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::CaptchaRejected { .. }));
    assert!(!err.user_message().contains("Captcha"));

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0].raw_html.as_deref().unwrap().contains("Invalid Captcha"));
}

#[tokio::test]
async fn test_captcha_rejected_beside_empty_results_table() {
    let server = MockServer::start().await;
    let redisplayed = search_page(r#"<div class="alert alert-danger">Invalid Captcha</div>"#)
        .replace("</body>", &format!("{}</body>", no_records_page()));
    mount_search(&server, redisplayed).await;
    let (searcher, log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::CaptchaRejected { .. }));

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0]
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("captcha_rejected"));
}

#[tokio::test]
async fn test_missing_captcha_is_structural() {
    let server = MockServer::start().await;
    let page = search_page("").replace(
        &format!(r#"<span id="captcha-code">{}</span>"#, CAPTCHA),
        "",
    );
    mount_page(&server, SEARCH_PATH, page).await;
    let (searcher, log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();
    assert!(matches!(err, SearchError::UnexpectedPageStructure { .. }));

    // The search page that failed to parse is kept for diagnosis
    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0].raw_html.is_some());
    assert!(entries[0].raw_html.as_deref().unwrap().contains("captchaInput"));
}

#[tokio::test]
async fn test_changed_results_headers_are_structural() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        r#"<table id="caseTable"><tr><th>Reference</th><th>Status</th></tr>
           <tr><td>W.P.(C) 1234/2023</td><td>Pending</td></tr></table>"#
            .to_string(),
    )
    .await;
    let (searcher, log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::UnexpectedPageStructure { .. }));

    searcher.flush_audit().await;
    assert_eq!(log.recent(1).unwrap()[0].status, AuditStatus::Error);
}

#[tokio::test]
async fn test_server_error_is_site_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (searcher, _log) = searcher(&server);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::SiteUnreachable { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_timeout_is_site_unreachable_with_own_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(search_page("")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = portal_config(&server);
    config.request_timeout_secs = 1;
    let (searcher, log) = searcher_with_config(config);

    let err = searcher.search(wp_query()).await.unwrap_err();

    match &err {
        SearchError::SiteUnreachable { detail } => assert!(detail.contains("timeout")),
        other => panic!("expected SiteUnreachable, got {:?}", other),
    }

    searcher.flush_audit().await;
    assert!(log.recent(1).unwrap()[0]
        .error_detail
        .as_deref()
        .unwrap()
        .contains("timeout"));
}

#[tokio::test]
async fn test_unreachable_portal() {
    let mut config = case_status::config::PortalConfig::new("http://127.0.0.1:9");
    config.connect_timeout_secs = 2;
    let (searcher, log) = searcher_with_config(config);

    let err = searcher.search(wp_query()).await.unwrap_err();

    assert!(matches!(err, SearchError::SiteUnreachable { .. }));

    searcher.flush_audit().await;
    assert_eq!(log.count().unwrap(), 1);
}

#[tokio::test]
async fn test_abandoned_search_is_audited_as_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(search_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(html(no_records_page()).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let (searcher, log) = searcher(&server);

    let result = tokio::time::timeout(Duration::from_millis(800), searcher.search(wp_query())).await;
    assert!(result.is_err(), "search should still be waiting on the submission");

    searcher.flush_audit().await;
    let entries = log.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0]
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("cancelled"));
    assert!(entries[0].raw_html.as_deref().unwrap().contains("captchaInput"));
}

struct FailingSink;

impl AuditSink for FailingSink {
    fn append(&self, _entry: &QueryAuditEntry) -> Result<i64, AuditError> {
        Err(AuditError::Database("disk full".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        Err(AuditError::Database("disk full".to_string()))
    }
}

/// Holds every append until the test releases it
struct GatedSink {
    gate: Mutex<mpsc::Receiver<()>>,
    written: AtomicUsize,
}

impl AuditSink for GatedSink {
    fn append(&self, _entry: &QueryAuditEntry) -> Result<i64, AuditError> {
        let gate = self.gate.lock().map_err(|_| AuditError::Poisoned)?;
        gate.recv()
            .map_err(|_| AuditError::Database("gate closed".to_string()))?;
        let written = self.written.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(written as i64)
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_slow_audit_store_does_not_delay_search() {
    let server = MockServer::start().await;
    mount_single_case(&server).await;

    let (release, gate) = mpsc::channel();
    let sink = Arc::new(GatedSink {
        gate: Mutex::new(gate),
        written: AtomicUsize::new(0),
    });
    let searcher = CaseSearcher::new(
        portal_config(&server),
        QueryAuditLogger::new(sink.clone()).unwrap(),
    );

    let record = searcher.search(wp_query()).await.unwrap();
    assert_eq!(record.order_links.len(), 3);
    assert_eq!(sink.written.load(Ordering::SeqCst), 0);

    release.send(()).unwrap();
    searcher.flush_audit().await;
    assert_eq!(sink.written.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_audit_sink_does_not_change_result() {
    let server = MockServer::start().await;
    mount_single_case(&server).await;

    let (working, _log) = searcher(&server);
    let failing = CaseSearcher::new(
        portal_config(&server),
        QueryAuditLogger::new(Arc::new(FailingSink)).unwrap(),
    );

    let expected = working.search(wp_query()).await.unwrap();
    let actual = failing.search(wp_query()).await.unwrap();

    assert_eq!(actual.parties, expected.parties);
    assert_eq!(actual.order_links, expected.order_links);
    assert_eq!(actual.next_hearing_date, expected.next_hearing_date);
}

#[tokio::test]
async fn test_failing_audit_sink_keeps_error_result() {
    let server = MockServer::start().await;
    mount_search(&server, no_records_page()).await;
    let failing = CaseSearcher::new(
        portal_config(&server),
        QueryAuditLogger::new(Arc::new(FailingSink)).unwrap(),
    );

    let err = failing.search(wp_query()).await.unwrap_err();
    assert!(matches!(err, SearchError::NotFound { .. }));
}

#[tokio::test]
async fn test_concurrent_searches_use_separate_sessions() {
    let server = MockServer::start().await;
    mount_single_case(&server).await;
    let (searcher, log) = searcher(&server);

    let (first, second) = tokio::join!(searcher.search(wp_query()), searcher.search(wp_query()));

    assert_eq!(first.unwrap().order_links.len(), 3);
    assert_eq!(second.unwrap().order_links.len(), 3);

    searcher.flush_audit().await;
    assert_eq!(log.count().unwrap(), 2);

    let search_page_loads = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.to_string() == "GET" && r.url.path() == SEARCH_PATH)
        .count();
    assert_eq!(search_page_loads, 2);
}

#[tokio::test]
async fn test_list_case_types() {
    let server = MockServer::start().await;
    mount_page(&server, SEARCH_PATH, search_page("")).await;
    let (searcher, log) = searcher(&server);

    let types = searcher.list_case_types().await.unwrap();

    assert_eq!(types, vec!["W.P.(C)", "CRL.M.C.", "LPA"]);

    searcher.flush_audit().await;
    assert_eq!(log.count().unwrap(), 0);
}
