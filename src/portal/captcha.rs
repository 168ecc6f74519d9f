//! CAPTCHA extraction
//!
//! The portal renders its CAPTCHA as plain text inside a display element, so
//! "solving" it is a DOM read. The read can still fail when the markup
//! changes, and that failure must stay distinct from an empty answer: an
//! empty CAPTCHA makes the site report an invalid case instead of an error.

use crate::model::CaptchaToken;
use crate::portal::dom::{element_text, select_first};
use crate::portal::schema::CAPTCHA_DISPLAY;
use crate::{PortalError, PortalResult};
use scraper::Html;

/// Reads the CAPTCHA value from a loaded search page
///
/// The value is taken from the display element's text, or from its `value`
/// attribute when the site renders it as a read-only input.
///
/// # Returns
///
/// * `Ok(CaptchaToken)` - Non-empty CAPTCHA value
/// * `Err(PortalError::CaptchaUnavailable)` - Element missing or blank
pub fn resolve_captcha(document: &Html) -> PortalResult<CaptchaToken> {
    let element = select_first(document, CAPTCHA_DISPLAY).ok_or(PortalError::CaptchaUnavailable)?;

    let value = element_text(element).or_else(|| {
        element
            .value()
            .attr("value")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    });

    match value {
        Some(value) => Ok(CaptchaToken {
            value: value.split_whitespace().collect(),
        }),
        None => Err(PortalError::CaptchaUnavailable),
    }
}

/// Convenience wrapper over [`resolve_captcha`] for raw HTML
pub fn resolve_captcha_from_html(html: &str) -> PortalResult<CaptchaToken> {
    resolve_captcha(&Html::parse_document(html))
}
