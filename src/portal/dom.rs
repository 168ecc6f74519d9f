//! Small DOM helpers shared by the page parsers

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses a CSS selector from the markup schema
///
/// Schema selectors are constants; a parse failure is logged and treated as
/// "nothing matched" so it surfaces as a structural error upstream.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// First element in the document matching `css`
pub fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    document.select(&selector).next()
}

/// All elements under `scope` matching `css`
pub fn select_within<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(selector) => scope.select(&selector).collect(),
        None => Vec::new(),
    }
}

/// Element text with whitespace collapsed, `None` when blank
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Whole-document text, used for marker checks
pub fn document_text(document: &Html) -> String {
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Resolves an href against the page it appeared on
///
/// Fragment-only and `javascript:` links are not navigable and yield `None`.
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        _ => None,
    }
}

/// A table split into header texts and data rows
pub struct TableLayout<'a> {
    pub headers: Vec<String>,
    /// Data rows, each as its ordered cell elements
    pub rows: Vec<Vec<ElementRef<'a>>>,
}

/// Splits a table into headers and data rows
///
/// The header is the first row with `<th>` cells, or the first row when the
/// table has none. Rows of nested tables are ignored.
pub fn table_layout(table: ElementRef<'_>) -> TableLayout<'_> {
    let rows: Vec<ElementRef<'_>> = select_within(table, "tr")
        .into_iter()
        .filter(|tr| owning_table(*tr).map(|t| t.id()) == Some(table.id()))
        .collect();

    let header_index = rows
        .iter()
        .position(|tr| row_cells(*tr).iter().any(|c| c.value().name() == "th"))
        .or(if rows.is_empty() { None } else { Some(0) });

    let headers = header_index
        .map(|index| {
            row_cells(rows[index])
                .into_iter()
                .map(|cell| element_text(cell).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    let data_rows = rows
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != header_index)
        .map(|(_, tr)| row_cells(*tr))
        .filter(|cells| cells.iter().any(|c| c.value().name() == "td"))
        .collect();

    TableLayout {
        headers,
        rows: data_rows,
    }
}

/// Whether a row is a single spanning placeholder cell ("No data available")
pub fn is_placeholder_row(cells: &[ElementRef<'_>]) -> bool {
    cells.len() == 1
        && cells[0]
            .value()
            .attr("colspan")
            .and_then(|span| span.trim().parse::<u32>().ok())
            .is_some_and(|span| span > 1)
}

fn row_cells(tr: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

fn owning_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}
