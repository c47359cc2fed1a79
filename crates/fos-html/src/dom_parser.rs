//! `DOMParser`
//!
//! String-sourced documents are scripting-disabled (nothing is fetched),
//! carry the parser's URL and come back already closed.

use fos_dom::{Document, DocumentOptions, DomError, FeatureSet, ParsingMode};
use url::Url;

use crate::{HtmlParser, XmlParser};

/// Content types `parse_from_string` accepts
pub const SUPPORTED_TYPES: [&str; 5] = [
    "text/html",
    "text/xml",
    "application/xml",
    "application/xhtml+xml",
    "image/svg+xml",
];

/// `DOMParser` bound to a document URL
#[derive(Debug, Clone)]
pub struct DomParser {
    url: String,
}

impl Default for DomParser {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
        }
    }
}

impl DomParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose documents take `url` as their URL
    pub fn with_url(url: &Url) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `parseFromString(markup, contentType)`
    pub fn parse_from_string(&self, markup: &str, content_type: &str) -> Result<Document, DomError> {
        let parsing_mode = match content_type {
            "text/html" => ParsingMode::Html,
            "text/xml" | "application/xml" | "application/xhtml+xml" | "image/svg+xml" => {
                ParsingMode::Xml
            }
            _ => return Err(DomError::Type(format!("Invalid contentType: {content_type}"))),
        };

        let mut document = Document::new(DocumentOptions {
            parsing_mode,
            content_type: content_type.to_string(),
            encoding: "UTF-8".to_string(),
            url: self.url.clone(),
            ..Default::default()
        })?;
        document.set_features(FeatureSet::scripting_disabled());

        match parsing_mode {
            ParsingMode::Html => HtmlParser::new().parse_into(&mut document, markup)?,
            ParsingMode::Xml => {
                XmlParser::new().parse_into(&mut document, markup)?;
            }
        }

        document.close();
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::{ns, ReadyState, FETCH_EXTERNAL_RESOURCES};

    #[test]
    fn test_html_document_is_closed_and_inert() {
        let doc = DomParser::new()
            .parse_from_string("<p id=x>hi</p>", "text/html")
            .unwrap();
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert!(doc.features().values(FETCH_EXTERNAL_RESOURCES).is_empty());
        assert!(doc.get_element_by_id("x").is_some());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err = DomParser::new()
            .parse_from_string("{}", "application/json")
            .unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn test_malformed_xml_yields_parsererror() {
        let doc = DomParser::new().parse_from_string("<a&b", "text/xml").unwrap();
        let children: Vec<_> = doc.tree().children(doc.root()).map(|(id, _)| id).collect();
        assert_eq!(children.len(), 1);
        let elem = doc.tree().element(children[0]).unwrap();
        assert!(elem.is(ns::PARSER_ERROR, "parsererror"));
        assert!(!doc.text_content(children[0]).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_svg_keeps_namespace() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;
        let doc = DomParser::new().parse_from_string(svg, "image/svg+xml").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(
            doc.tree().element(root).unwrap().interface,
            fos_dom::ElementInterface::SvgSvg
        );
        assert_eq!(doc.content_type(), "image/svg+xml");
    }

    #[test]
    fn test_with_url() {
        let url = Url::parse("https://example.com/a/").unwrap();
        let doc = DomParser::with_url(&url)
            .parse_from_string("<a href='b'>x</a>", "text/html")
            .unwrap();
        assert_eq!(doc.url().as_str(), "https://example.com/a/");
        let a = doc.query_selector(doc.root(), "a").unwrap().unwrap();
        assert_eq!(
            doc.reflect_get(a, "href").unwrap().as_str(),
            Some("https://example.com/a/b")
        );
    }
}
