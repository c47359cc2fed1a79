//! Comprehensive tests for fos-html
//!
//! HTML parsing into a queryable document and the `DomParser` boundary.

use fos_dom::{ns, ElementInterface, NodeType, ReadyState};
use fos_html::{parse, DomParser, HtmlParser, XmlOutcome, XmlParser, SUPPORTED_TYPES};

#[test]
fn test_parse_minimal_html() {
    let doc = parse("").unwrap();
    // html5ever always builds html/head/body
    assert!(doc.document_element().is_some());
    assert!(doc.head().is_some());
    assert!(doc.body().is_some());
}

#[test]
fn test_parse_text_only() {
    let doc = parse("Hello World").unwrap();
    let body = doc.body().unwrap();
    assert_eq!(doc.text_content(body).as_deref(), Some("Hello World"));
}

#[test]
fn test_parse_nested_structure() {
    let html = r#"
        <html>
            <head>
                <title>Test Page</title>
                <meta charset="utf-8">
            </head>
            <body>
                <div id="container">
                    <h1>Welcome</h1>
                    <p class="intro">This is a test.</p>
                    <ul>
                        <li>Item 1</li>
                        <li>Item 2</li>
                        <li>Item 3</li>
                    </ul>
                </div>
            </body>
        </html>
    "#;

    let doc = parse(html).unwrap();
    assert_eq!(doc.title(), "Test Page");
    let container = doc.get_element_by_id("container").unwrap();
    assert_eq!(doc.child_element_count(container), 3);
    assert_eq!(doc.query_selector_all(doc.root(), "ul > li").unwrap().len(), 3);
    let intro = doc.get_elements_by_class_name(doc.root(), "intro");
    assert_eq!(doc.collection_len(intro), 1);
}

#[test]
fn test_parse_malformed_html() {
    let html = r#"
        <div>
            <p>Unclosed paragraph
            <span>Unclosed span
        </div>
        <p>Another paragraph without closing
    "#;

    let doc = parse(html).unwrap();
    assert_eq!(doc.query_selector_all(doc.root(), "p").unwrap().len(), 2);
}

#[test]
fn test_parse_with_attributes() {
    let html = r#"
        <div id="main" class="container primary" data-value="123">
            <a href="https://example.com" target="_blank">Link</a>
        </div>
    "#;

    let doc = parse(html).unwrap();
    let main = doc.get_element_by_id("main").unwrap();
    assert_eq!(doc.get_attribute(main, "data-value"), Some("123"));
    assert_eq!(
        doc.reflect_get(main, "className").unwrap().as_str(),
        Some("container primary")
    );
    let link = doc.query_selector(main, "a[target=\"_blank\"]").unwrap().unwrap();
    assert_eq!(
        doc.reflect_get(link, "href").unwrap().as_str(),
        Some("https://example.com/")
    );
}

#[test]
fn test_parse_script_and_style() {
    let html = r#"
        <html>
            <head>
                <style>.foo { color: blue; }</style>
                <script>
                    function foo() {
                        return "<div>not parsed</div>";
                    }
                </script>
            </head>
            <body><p>Content</p></body>
        </html>
    "#;

    let doc = parse(html).unwrap();
    assert!(doc.query_selector(doc.root(), "div").unwrap().is_none());
    let script = doc.query_selector(doc.root(), "script").unwrap().unwrap();
    assert!(doc.text_content(script).unwrap().contains("not parsed"));
}

#[test]
fn test_parse_entities() {
    let doc = parse(r#"<p>&lt;tag&gt; &amp; &quot;quotes&quot; &#169;</p>"#).unwrap();
    let p = doc.query_selector(doc.root(), "p").unwrap().unwrap();
    assert_eq!(doc.text_content(p).as_deref(), Some("<tag> & \"quotes\" \u{a9}"));
}

#[test]
fn test_parse_comments_and_doctype() {
    let doc = parse("<!DOCTYPE html><!-- top --><div><!-- inner --></div>").unwrap();
    let kinds: Vec<_> = doc
        .tree()
        .children(doc.root())
        .map(|(_, node)| node.node_type())
        .collect();
    assert_eq!(
        kinds,
        vec![NodeType::DocumentType, NodeType::Comment, NodeType::Element]
    );
}

#[test]
fn test_parse_large_document() {
    let mut html = String::from("<html><body>");
    for i in 0..1000 {
        html.push_str(&format!(r#"<div id="div-{i}" class="item"><p>Paragraph {i}</p></div>"#));
    }
    html.push_str("</body></html>");

    let doc = parse(&html).unwrap();
    assert!(doc.tree().len() > 2000);
    assert!(doc.get_element_by_id("div-999").is_some());
    let items = doc.get_elements_by_class_name(doc.root(), "item");
    assert_eq!(doc.collection_len(items), 1000);
}

#[test]
fn test_parse_table_interfaces() {
    let html = r#"
        <table>
            <tr><th scope="col">Header</th></tr>
            <tr><td colspan="2">Cell</td></tr>
        </table>
    "#;

    let doc = parse(html).unwrap();
    let td = doc.query_selector(doc.root(), "td").unwrap().unwrap();
    assert_eq!(doc.tree().element(td).unwrap().interface, ElementInterface::HtmlTableCell);
    assert_eq!(doc.reflect_get(td, "colSpan").unwrap().as_i64(), Some(2));
    // the tree builder inserts tbody
    assert!(doc.query_selector(doc.root(), "table > tbody > tr").unwrap().is_some());
}

#[test]
fn test_parse_forms() {
    let html = r#"
        <form action="/submit" method="post" name="signup">
            <input type="text" id="name" name="name" required>
            <select name="country">
                <option value="us">USA</option>
                <option value="uk" selected>UK</option>
            </select>
            <button type="submit" disabled>Submit</button>
        </form>
    "#;

    let doc = parse(html).unwrap();
    let input = doc.get_element_by_id("name").unwrap();
    assert_eq!(doc.reflect_get(input, "required").unwrap().as_bool(), Some(true));
    assert_eq!(doc.query_selector_all(doc.root(), ":checked").unwrap().len(), 1);
    assert_eq!(doc.query_selector_all(doc.root(), "button:disabled").unwrap().len(), 1);

    let named = doc.named_objects("signup");
    assert_eq!(doc.collection_len(named), 1);
}

#[test]
fn test_parse_inline_svg() {
    let doc = parse(r#"<svg viewBox="0 0 10 10" preserveAspectRatio="xMinYMin slice"></svg>"#).unwrap();
    let svg = doc.query_selector(doc.root(), "svg").unwrap().unwrap();
    let elem = doc.tree().element(svg).unwrap();
    assert!(elem.is(ns::SVG, "svg"));
    let (base, _) = doc.preserve_aspect_ratio(svg).unwrap();
    assert_eq!(base.value(doc.tree()).align, fos_dom::AspectRatioAlign::XMinYMin);
}

#[test]
fn test_xml_parser_outcomes() {
    let mut doc = fos_dom::Document::new(fos_dom::DocumentOptions {
        parsing_mode: fos_dom::ParsingMode::Xml,
        ..Default::default()
    })
    .unwrap();
    let outcome = XmlParser::new().parse_into(&mut doc, "<root/>").unwrap();
    assert!(matches!(outcome, XmlOutcome::WellFormed));

    let doc = XmlParser::new().parse("<a></a><b></b>", "about:blank").unwrap();
    let root = doc.document_element().unwrap();
    assert!(doc.tree().element(root).unwrap().is(ns::PARSER_ERROR, "parsererror"));
}

#[test]
fn test_dom_parser_all_supported_types() {
    let parser = DomParser::new();
    for content_type in SUPPORTED_TYPES {
        let doc = parser.parse_from_string("<root/>", content_type).unwrap();
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert_eq!(doc.content_type(), content_type);
        assert!(doc.document_element().is_some());
    }
}

#[test]
fn test_scripting_flag_affects_noscript() {
    let html = "<head><noscript><meta name=a></noscript></head>";
    let off = HtmlParser::new().parse(html).unwrap();
    assert!(off.query_selector(off.root(), "noscript > meta").unwrap().is_some());

    let on = HtmlParser::new().with_scripting(true).parse(html).unwrap();
    assert!(on.query_selector(on.root(), "noscript > meta").unwrap().is_none());
}
