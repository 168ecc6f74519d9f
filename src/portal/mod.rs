//! Portal access: sessions, the search form and page parsing
//!
//! Everything that knows about the court portal's markup lives here.
//!
//! # Components
//!
//! - `session`: per-query HTTP session with its own cookie jar
//! - `schema`: the portal's markup contract (ids, table headers, markers)
//! - `captcha`: reads the plaintext CAPTCHA from the search page
//! - `form`: fills and submits the search form, classifies the response
//! - `results`: parses the results table into raw case rows
//! - `orders`: walks a case's paginated orders listing

pub mod captcha;
mod dom;
pub mod form;
pub mod orders;
pub mod results;
pub mod schema;
pub mod session;

pub use captcha::{resolve_captcha, resolve_captcha_from_html};
pub use form::{list_case_types, load_search_page, submit_search, SearchResponse};
pub use orders::{resolve_order_links, OrderResolution};
pub use results::parse_results;
pub use session::{LoadedPage, PortalSession};
