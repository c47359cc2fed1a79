//! fOS HTML Parser
//!
//! Parsing boundary for the headless DOM: html5ever for HTML, xml5ever for
//! XML, both copied into a `fos_dom::Document`.

mod dom_parser;
mod parser;

pub use dom_parser::{DomParser, SUPPORTED_TYPES};
pub use parser::{HtmlParser, XmlOutcome, XmlParser};

use fos_dom::{Document, DomError};

/// Parse an HTML string into a new `about:blank` document
pub fn parse(html: &str) -> Result<Document, DomError> {
    HtmlParser::new().parse(html)
}

/// Parse HTML into an existing, empty document
pub fn parse_html_into(document: &mut Document, html: &str) -> Result<(), DomError> {
    HtmlParser::new().parse_into(document, html)
}
