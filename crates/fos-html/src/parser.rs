//! Markup parsers
//!
//! Both parsers run html5ever/xml5ever into an `RcDom` and then copy the
//! result into a `fos_dom::Document`.

use fos_dom::{ns, Document, DocumentOptions, DomError, NodeId, ParsingMode};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML5 parser
#[derive(Debug, Clone)]
pub struct HtmlParser {
    scripting_enabled: bool,
}

impl HtmlParser {
    /// Create a new HTML parser (scripting flag off)
    pub fn new() -> Self {
        Self {
            scripting_enabled: false,
        }
    }

    /// Parse `<noscript>` as if scripting were on
    pub fn with_scripting(mut self, enabled: bool) -> Self {
        self.scripting_enabled = enabled;
        self
    }

    /// Parse an HTML string into a new document at `about:blank`
    pub fn parse(&self, html: &str) -> Result<Document, DomError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, DomError> {
        let mut document = Document::new(DocumentOptions {
            url: url.to_string(),
            ..Default::default()
        })?;
        self.parse_into(&mut document, html)?;
        Ok(document)
    }

    /// Parse HTML into an existing, empty document
    pub fn parse_into(&self, document: &mut Document, html: &str) -> Result<(), DomError> {
        tracing::debug!(url = %document.url(), "Parsing HTML document");

        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: self.scripting_enabled,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = html5ever::parse_document(RcDom::default(), opts).one(html);

        let root = document.root();
        for child in dom.document.children.borrow().iter() {
            convert_node(child, document, root)?;
        }

        tracing::debug!(nodes = document.tree().len(), "Parsed HTML");
        Ok(())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of an XML parse
#[derive(Debug)]
pub enum XmlOutcome {
    /// Well-formed, single root element
    WellFormed,
    /// First error reported by the parser
    Malformed(String),
}

/// XML parser (xml5ever)
#[derive(Debug, Clone, Default)]
pub struct XmlParser;

impl XmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse XML into an existing, empty XML document
    ///
    /// Malformed input leaves the document holding only a `parsererror`
    /// element in the parser-error namespace.
    pub fn parse_into(&self, document: &mut Document, xml: &str) -> Result<XmlOutcome, DomError> {
        tracing::debug!(url = %document.url(), "Parsing XML document");

        let dom = xml5ever::driver::parse_document(RcDom::default(), Default::default()).one(xml);

        let children = dom.document.children.borrow();
        let root_elements = children
            .iter()
            .filter(|c| matches!(c.data, RcNodeData::Element { .. }))
            .count();
        let first_error = dom.errors.borrow().first().map(|e| e.to_string());

        let problem = match (first_error, root_elements) {
            (Some(error), _) => Some(error),
            (None, 0) => Some("No root element".to_string()),
            (None, 1) => None,
            (None, _) => Some("Extra content at the end of the document".to_string()),
        };

        if let Some(message) = problem {
            tracing::debug!(%message, "XML parse failed");
            let error = document.create_element_raw(Some(ns::PARSER_ERROR), None, "parsererror");
            let text = document.create_text_node(&message);
            document.append_child(error, text)?;
            let root = document.root();
            document.append_child(root, error)?;
            return Ok(XmlOutcome::Malformed(message));
        }

        let root = document.root();
        for child in children.iter() {
            convert_node(child, document, root)?;
        }
        Ok(XmlOutcome::WellFormed)
    }

    /// Parse XML into a new document
    pub fn parse(&self, xml: &str, url: &str) -> Result<Document, DomError> {
        let mut document = Document::new(DocumentOptions {
            url: url.to_string(),
            parsing_mode: ParsingMode::Xml,
            content_type: "application/xml".to_string(),
            ..Default::default()
        })?;
        self.parse_into(&mut document, xml)?;
        Ok(document)
    }
}

fn namespace_of(ns: &str) -> Option<&str> {
    (!ns.is_empty()).then_some(ns)
}

/// Copy an RcDom node (and its subtree) under `parent`
fn convert_node(handle: &Handle, document: &mut Document, parent: NodeId) -> Result<(), DomError> {
    let id = match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(child, document, parent)?;
            }
            return Ok(());
        }
        RcNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => document.create_doctype(name, public_id, system_id),
        RcNodeData::Text { contents } => document.create_text_node(&contents.borrow()),
        RcNodeData::Comment { contents } => document.create_comment(contents),
        RcNodeData::ProcessingInstruction { target, contents } => {
            document.create_processing_instruction(target, contents)?
        }
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let id = document.create_element_raw(
                namespace_of(&name.ns),
                name.prefix.as_deref(),
                &name.local,
            );
            for attr in attrs.borrow().iter() {
                let qualified = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", &**prefix, &*attr.name.local),
                    None => attr.name.local.to_string(),
                };
                document.set_attribute_ns(id, namespace_of(&attr.name.ns), &qualified, &attr.value)?;
            }
            // template contents are flattened into the element
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    convert_node(child, document, id)?;
                }
            }
            id
        }
    };

    document.append_child(parent, id)?;
    for child in handle.children.borrow().iter() {
        convert_node(child, document, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html).unwrap();

        assert_eq!(doc.title(), "Test");
        assert!(doc.body().is_some());
        assert!(doc.tree().len() > 1, "Expected more than 1 node, got {}", doc.tree().len());
    }

    #[test]
    fn test_parse_fragment() {
        let html = "<div><span>Text</span></div>";
        let doc = HtmlParser::new().parse(html).unwrap();

        // Even fragments get wrapped in html/head/body by html5ever
        assert!(doc.head().is_some());
        assert!(doc.query_selector(doc.root(), "body > div > span").unwrap().is_some());
    }

    #[test]
    fn test_parse_doctype() {
        let doc = HtmlParser::new().parse("<!DOCTYPE html><p>x</p>").unwrap();
        let first = doc.tree().first_child(doc.root()).unwrap();
        assert_eq!(doc.tree().get(first).unwrap().node_type(), fos_dom::NodeType::DocumentType);
    }

    #[test]
    fn test_parse_xml_well_formed() {
        let doc = XmlParser::new().parse("<root><Item a='1'/></root>", "about:blank").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.tree().element(root).unwrap().local_name, "root");
        let item = doc.first_element_child(root).unwrap();
        assert_eq!(doc.tree().element(item).unwrap().local_name, "Item");
        assert_eq!(doc.get_attribute(item, "a"), Some("1"));
    }

    #[test]
    fn test_parse_xml_malformed() {
        let doc = XmlParser::new().parse("<a&b", "about:blank").unwrap();
        let root = doc.document_element().unwrap();
        let elem = doc.tree().element(root).unwrap();
        assert!(elem.is(ns::PARSER_ERROR, "parsererror"));
        assert!(!doc.text_content(root).unwrap_or_default().is_empty());
    }
}
