//! Search form submission
//!
//! Drives the case-status search: load the search page, fill the form from a
//! `CaseQuery` and a freshly read CAPTCHA, submit, and classify what came
//! back. Submission changes state on the remote side, so nothing here
//! retries.

use crate::model::CaseQuery;
use crate::portal::captcha::resolve_captcha;
use crate::portal::dom::{document_text, element_text, select_first, select_within, table_layout};
use crate::portal::schema::{
    has_no_record_marker, match_columns, CAPTCHA_INPUT, CASE_NUMBER_INPUT, CASE_TABLE,
    CASE_TYPE_SELECT, CASE_YEAR_INPUT, ERROR_BANNER, RESULT_COLUMNS, SUBMIT_CONTROL,
};
use crate::portal::session::{LoadedPage, PortalSession};
use crate::{PortalError, PortalResult};
use scraper::{ElementRef, Html};
use url::Url;

/// How the search form is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A filled-in search form, ready to submit
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub action: Url,
    pub method: FormMethod,
    /// Fields in submission order
    pub fields: Vec<(String, String)>,
}

/// The page returned by a search submission
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub url: Url,
    pub html: String,
}

impl SearchResponse {
    /// Classifies the response
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A results table is present
    /// * `Ok(false)` - The site reported no matching records
    /// * `Err(PortalError::CaptchaRejected)` - The form came back with an error banner
    /// * `Err(PortalError::UnexpectedPageStructure)` - None of the above
    pub fn found(&self) -> PortalResult<bool> {
        classify_response(&self.html, &self.url)
    }
}

/// Loads the search page on `session`
///
/// The page carries the session's CAPTCHA, so it must be submitted with the
/// same session.
pub async fn load_search_page(session: &PortalSession) -> PortalResult<LoadedPage> {
    session.get(session.search_url()).await
}

/// Fills the form on `search_page` from `query` and submits it
///
/// The CAPTCHA is read from this page load and used once.
pub async fn submit_search(
    session: &PortalSession,
    search_page: &LoadedPage,
    query: &CaseQuery,
) -> PortalResult<SearchResponse> {
    let prepared = prepare_search(search_page, query)?;

    tracing::debug!(
        "Session {}: submitting {} to {} ({} fields)",
        session.id(),
        query,
        prepared.action,
        prepared.fields.len()
    );

    let response = match prepared.method {
        FormMethod::Get => {
            session
                .get_with_query(&prepared.action, &prepared.fields)
                .await?
        }
        FormMethod::Post => session.post_form(&prepared.action, &prepared.fields).await?,
    };

    Ok(SearchResponse {
        url: response.url,
        html: response.body,
    })
}

/// Lists the case types offered by the search page's dropdown
pub async fn list_case_types(session: &PortalSession) -> PortalResult<Vec<String>> {
    let page = load_search_page(session).await?;
    let document = Html::parse_document(&page.body);
    let select = select_first(&document, CASE_TYPE_SELECT)
        .ok_or_else(|| PortalError::structure(&page.url, "case type selector not found"))?;

    let types = option_values(select);
    if types.is_empty() {
        return Err(PortalError::structure(&page.url, "case type selector has no options"));
    }
    Ok(types)
}

/// Fills the search form found on `page`
pub fn prepare_search(page: &LoadedPage, query: &CaseQuery) -> PortalResult<PreparedSearch> {
    let document = Html::parse_document(&page.body);

    let form = find_form(&document, CAPTCHA_INPUT).or_else(|| find_form(&document, CASE_TYPE_SELECT));
    let scope = form.unwrap_or_else(|| document.root_element());

    let case_type = find_control(scope, CASE_TYPE_SELECT, &page.url)?;
    let case_number = find_control(scope, CASE_NUMBER_INPUT, &page.url)?;
    let case_year = find_control(scope, CASE_YEAR_INPUT, &page.url)?;
    let captcha_input = find_control(scope, CAPTCHA_INPUT, &page.url)?;

    let offered = option_values(case_type.element);
    if !offered.is_empty() && !offered.iter().any(|v| v == &query.case_type) {
        return Err(PortalError::UnknownCaseType(query.case_type.clone()));
    }

    let captcha = resolve_captcha(&document)?;

    let mut fields: Vec<(String, String)> = select_within(scope, "input[type=hidden][name]")
        .into_iter()
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    fields.push((case_type.name, query.case_type.clone()));
    fields.push((case_number.name, query.case_number.clone()));
    fields.push((case_year.name, query.filing_year.to_string()));
    fields.push((captcha_input.name, captcha.value));

    // A clicked submit button is part of the form data when it is named
    if let Some(submit) = select_within(scope, SUBMIT_CONTROL).into_iter().next() {
        if let Some(name) = submit.value().attr("name") {
            let value = submit.value().attr("value").unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
    }

    let (action, method) = match form {
        Some(form) => form_target(form, &page.url),
        None => (page.url.clone(), FormMethod::Post),
    };

    Ok(PreparedSearch {
        action,
        method,
        fields,
    })
}

/// Classifies a search response page
///
/// A redisplayed form with an error banner is checked first. The site keeps
/// its empty results table, "no data" row included, on that page. After that
/// the no-records check runs before the table check, since the no-records
/// message is rendered inside the otherwise empty results table.
pub fn classify_response(html: &str, url: &Url) -> PortalResult<bool> {
    let document = Html::parse_document(html);

    if select_first(&document, CAPTCHA_INPUT).is_some() {
        if let Some(banner) = select_first(&document, ERROR_BANNER).and_then(element_text) {
            return Err(PortalError::CaptchaRejected { banner });
        }
    }

    if has_no_record_marker(&document_text(&document)) {
        return Ok(false);
    }

    if has_results_table(&document) {
        return Ok(true);
    }

    Err(PortalError::structure(
        url,
        "neither a results table nor a no-records message was found",
    ))
}

fn has_results_table(document: &Html) -> bool {
    if select_first(document, CASE_TABLE).is_some() {
        return true;
    }

    select_within(document.root_element(), "table")
        .into_iter()
        .any(|table| match_columns(&table_layout(table).headers, RESULT_COLUMNS).is_ok())
}

/// The `<form>` element containing `control`, if the page wraps it in one
fn find_form<'a>(document: &'a Html, control: &str) -> Option<ElementRef<'a>> {
    select_within(document.root_element(), "form")
        .into_iter()
        .find(|form| !select_within(*form, control).is_empty())
}

/// A form control and the name it is submitted under
struct FormControl<'a> {
    element: ElementRef<'a>,
    name: String,
}

fn find_control<'a>(scope: ElementRef<'a>, css: &str, page_url: &Url) -> PortalResult<FormControl<'a>> {
    let element = select_within(scope, css)
        .into_iter()
        .next()
        .ok_or_else(|| PortalError::structure(page_url, format!("form control {} not found", css)))?;

    let name = element
        .value()
        .attr("name")
        .or_else(|| element.value().attr("id"))
        .unwrap_or_default()
        .to_string();

    Ok(FormControl { element, name })
}

fn option_values(select: ElementRef<'_>) -> Vec<String> {
    select_within(select, "option")
        .into_iter()
        .filter_map(|option| {
            option
                .value()
                .attr("value")
                .map(|v| v.trim().to_string())
                .or_else(|| element_text(option))
        })
        .filter(|value| !value.is_empty())
        .collect()
}

fn form_target(form: ElementRef<'_>, page_url: &Url) -> (Url, FormMethod) {
    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .and_then(|a| page_url.join(a).ok())
        .unwrap_or_else(|| page_url.clone());

    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("get") => FormMethod::Get,
        _ => FormMethod::Post,
    };

    (action, method)
}
