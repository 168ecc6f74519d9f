//! Orders listing pagination against a mock portal

use crate::common::*;
use case_status::model::ResolutionWarning;
use case_status::portal::{resolve_order_links, PortalSession};
use case_status::PortalError;
use url::Url;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves `/orders/{n}` for n in 1..=pages, each page linking to the next
/// and the last linking back to the first
struct CyclingOrders {
    pages: u32,
}

impl Respond for CyclingOrders {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let current: u32 = request
            .url
            .path()
            .trim_start_matches("/orders/")
            .parse()
            .unwrap_or(1);
        let next = current % self.pages + 1;
        let document = format!("doc-{}", current);

        html(orders_page(&[document.as_str()], Some(&format!("/orders/{}", next))))
    }
}

fn session(server: &MockServer) -> PortalSession {
    PortalSession::open(&portal_config(server)).unwrap()
}

fn url(server: &MockServer, page_path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page_path)).unwrap()
}

#[tokio::test]
async fn test_three_pages_with_duplicate_boundary() {
    let server = MockServer::start().await;
    mount_page(&server, "/orders/a", orders_page(&["d1", "d2"], Some("/orders/b"))).await;
    mount_page(
        &server,
        "/orders/b",
        orders_page(&["d2", "d3", "d4"], Some("/orders/c")),
    )
    .await;
    mount_page(&server, "/orders/c", orders_page(&["d4", "d5", "d6"], None)).await;

    let resolution = resolve_order_links(&session(&server), &url(&server, "/orders/a"), 50)
        .await
        .unwrap();

    let labels: Vec<&str> = resolution.links.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["d1", "d2", "d3", "d4", "d5", "d6"]);

    let pages: Vec<usize> = resolution.links.iter().map(|l| l.page_index).collect();
    assert_eq!(pages, vec![1, 1, 2, 2, 3, 3]);

    assert_eq!(resolution.pages_fetched, 3);
    assert!(resolution.warnings.is_empty());
}

#[tokio::test]
async fn test_endless_pagination_hits_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/orders/\d+$"))
        .respond_with(CyclingOrders { pages: 500 })
        .mount(&server)
        .await;

    let resolution = resolve_order_links(&session(&server), &url(&server, "/orders/1"), 50)
        .await
        .unwrap();

    assert_eq!(resolution.pages_fetched, 50);
    assert_eq!(resolution.links.len(), 50);
    assert_eq!(resolution.links[49].label, "doc-50");
    assert_eq!(
        resolution.warnings,
        vec![ResolutionWarning::PaginationLimitExceeded { pages_fetched: 50 }]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 50);
}

#[tokio::test]
async fn test_pagination_cycle_stops_without_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/orders/\d+$"))
        .respond_with(CyclingOrders { pages: 3 })
        .mount(&server)
        .await;

    let resolution = resolve_order_links(&session(&server), &url(&server, "/orders/1"), 50)
        .await
        .unwrap();

    assert_eq!(resolution.pages_fetched, 3);
    assert_eq!(resolution.links.len(), 3);
    assert!(resolution.warnings.is_empty());
}

#[tokio::test]
async fn test_last_page_at_ceiling_is_complete() {
    let server = MockServer::start().await;
    mount_page(&server, "/orders/a", orders_page(&["d1"], Some("/orders/b"))).await;
    mount_page(&server, "/orders/b", orders_page(&["d2"], None)).await;

    let resolution = resolve_order_links(&session(&server), &url(&server, "/orders/a"), 2)
        .await
        .unwrap();

    assert_eq!(resolution.links.len(), 2);
    assert!(resolution.warnings.is_empty());
}

#[tokio::test]
async fn test_empty_orders_listing() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/orders/a",
        "<html><body><p>No record found</p></body></html>".to_string(),
    )
    .await;

    let resolution = resolve_order_links(&session(&server), &url(&server, "/orders/a"), 50)
        .await
        .unwrap();

    assert!(resolution.links.is_empty());
    assert_eq!(resolution.pages_fetched, 1);
}

#[tokio::test]
async fn test_unrecognized_orders_page_is_structural() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/orders/a",
        "<html><body><h1>Login required</h1></body></html>".to_string(),
    )
    .await;

    let result = resolve_order_links(&session(&server), &url(&server, "/orders/a"), 50).await;

    assert!(matches!(
        result,
        Err(PortalError::UnexpectedPageStructure { .. })
    ));
}
