//! Orders/judgments listing resolution
//!
//! Walks a case's paginated orders listing and collects its document links.
//! Pages are fetched one at a time on the query's own session.

use crate::model::{OrderLink, ResolutionWarning};
use crate::portal::dom::{
    document_text, element_text, is_placeholder_row, resolve_href, select_first, select_within,
    table_layout,
};
use crate::portal::schema::{
    has_no_record_marker, match_columns, OrderColumn, CASE_TABLE, NEXT_PAGE_LABELS, ORDER_COLUMNS,
};
use crate::portal::session::PortalSession;
use crate::{PortalError, PortalResult};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// One document row of an orders page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub label: String,
    pub document_url: Url,
    pub order_date: Option<String>,
}

/// The parsed content of one orders page
#[derive(Debug, Clone, Default)]
pub struct OrdersPage {
    pub entries: Vec<OrderEntry>,
    /// Target of the "next page" control, if one is present and enabled
    pub next_page: Option<Url>,
}

/// All order links of a case, plus anything that made the list partial
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderResolution {
    pub links: Vec<OrderLink>,
    pub pages_fetched: usize,
    pub warnings: Vec<ResolutionWarning>,
}

/// Fetches every page of a case's orders listing
///
/// # Pagination
///
/// | Condition | Action |
/// |-----------|--------|
/// | No next-page control | Stop |
/// | Next page already visited | Stop (pagination cycle) |
/// | `max_pages` fetched and more advertised | Stop, attach `PaginationLimitExceeded` |
///
/// Links are deduplicated by document URL, keeping the first occurrence, so
/// a row repeated across a page boundary is reported once.
///
/// # Arguments
///
/// * `session` - The query's portal session
/// * `detail_url` - First page of the orders listing
/// * `max_pages` - Page-count safety ceiling
pub async fn resolve_order_links(
    session: &PortalSession,
    detail_url: &Url,
    max_pages: usize,
) -> PortalResult<OrderResolution> {
    let mut resolution = OrderResolution::default();
    let mut visited: HashSet<Url> = HashSet::new();
    let mut seen_documents: HashSet<String> = HashSet::new();
    let mut next = Some(detail_url.clone());

    while let Some(url) = next.take() {
        if resolution.pages_fetched >= max_pages {
            tracing::warn!(
                "Orders listing {} still paginating after {} pages; returning partial links",
                detail_url,
                resolution.pages_fetched
            );
            resolution
                .warnings
                .push(ResolutionWarning::PaginationLimitExceeded {
                    pages_fetched: resolution.pages_fetched,
                });
            break;
        }

        visited.insert(url.clone());
        let page = session.get(&url).await?;
        visited.insert(page.url.clone());
        resolution.pages_fetched += 1;
        let page_index = resolution.pages_fetched;

        let parsed = parse_orders_page(&page.body, &page.url)?;
        tracing::debug!(
            "Orders page {} of {}: {} documents",
            page_index,
            detail_url,
            parsed.entries.len()
        );

        for entry in parsed.entries {
            let document_url = entry.document_url.to_string();
            if seen_documents.insert(document_url.clone()) {
                resolution.links.push(OrderLink {
                    label: entry.label,
                    document_url,
                    page_index,
                    order_date: entry.order_date,
                });
            }
        }

        next = parsed.next_page.filter(|candidate| {
            let unvisited = !visited.contains(candidate);
            if !unvisited {
                tracing::debug!("Pagination of {} loops back to {}", detail_url, candidate);
            }
            unvisited
        });
    }

    Ok(resolution)
}

/// Parses one orders page
///
/// # Returns
///
/// * `Ok(OrdersPage)` - Document entries in row order and the next-page target
/// * `Err(PortalError::UnexpectedPageStructure)` - No orders table and no
///   no-records message
pub fn parse_orders_page(html: &str, page_url: &Url) -> PortalResult<OrdersPage> {
    let document = Html::parse_document(html);
    let next_page = find_next_page(&document, page_url);

    let preferred = select_first(&document, CASE_TABLE);
    let tables = select_within(document.root_element(), "table");

    for table in preferred.into_iter().chain(tables) {
        let layout = table_layout(table);
        let Ok(columns) = match_columns(&layout.headers, ORDER_COLUMNS) else {
            continue;
        };

        let document_column = columns.position(OrderColumn::Document);
        let date_column = columns.position(OrderColumn::Date);

        let entries = layout
            .rows
            .iter()
            .filter(|cells| !is_placeholder_row(cells))
            .filter_map(|cells| parse_entry(cells, document_column, date_column, page_url))
            .collect();

        return Ok(OrdersPage { entries, next_page });
    }

    if has_no_record_marker(&document_text(&document)) {
        return Ok(OrdersPage {
            entries: Vec::new(),
            next_page,
        });
    }

    Err(PortalError::structure(page_url, "no orders table found"))
}

fn parse_entry(
    cells: &[ElementRef<'_>],
    document_column: Option<usize>,
    date_column: Option<usize>,
    page_url: &Url,
) -> Option<OrderEntry> {
    let in_column = document_column
        .and_then(|i| cells.get(i))
        .and_then(|cell| first_link(*cell, page_url));
    let (anchor, document_url) =
        in_column.or_else(|| cells.iter().find_map(|cell| first_link(*cell, page_url)))?;

    let label = element_text(anchor).unwrap_or_else(|| file_name(&document_url));
    let order_date = date_column
        .and_then(|i| cells.get(i))
        .and_then(|cell| element_text(*cell));

    Some(OrderEntry {
        label,
        document_url,
        order_date,
    })
}

fn first_link<'a>(cell: ElementRef<'a>, page_url: &Url) -> Option<(ElementRef<'a>, Url)> {
    select_within(cell, "a[href]").into_iter().find_map(|a| {
        let href = a.value().attr("href")?;
        resolve_href(href, page_url).map(|url| (a, url))
    })
}

fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string())
}

/// Target of the first enabled "next page" control
fn find_next_page(document: &Html, page_url: &Url) -> Option<Url> {
    select_within(document.root_element(), "a[href]")
        .into_iter()
        .filter(|a| is_next_control(*a) && !is_disabled(*a))
        .find_map(|a| resolve_href(a.value().attr("href")?, page_url))
}

fn is_next_control(anchor: ElementRef<'_>) -> bool {
    let element = anchor.value();
    if element
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
    {
        return true;
    }
    if element.classes().any(|c| c.eq_ignore_ascii_case("next")) {
        return true;
    }
    if parent_element(anchor)
        .is_some_and(|p| p.value().name() == "li" && p.value().classes().any(|c| c == "next"))
    {
        return true;
    }

    let in_pagination = anchor.ancestors().filter_map(ElementRef::wrap).any(|el| {
        el.value()
            .classes()
            .any(|c| c.contains("pagination") || c.contains("paginate"))
    });
    in_pagination
        && element_text(anchor).is_some_and(|text| {
            let text = text.to_lowercase();
            NEXT_PAGE_LABELS.iter().any(|label| text == *label)
        })
}

fn is_disabled(anchor: ElementRef<'_>) -> bool {
    let disabled = |el: ElementRef<'_>| {
        el.value().classes().any(|c| c == "disabled")
            || el.value().attr("aria-disabled") == Some("true")
    };
    disabled(anchor) || parent_element(anchor).is_some_and(disabled)
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}
