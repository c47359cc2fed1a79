//! Edge case tests for fos-dom
//!
//! Hierarchy errors, features, loader bookkeeping, cookies and events.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fos_dom::{
    ns, CookieJar, Document, DocumentFeatureOverrides, DocumentOptions, Event, FeatureSource,
    FeatureValue, MemoryCookieJar, NodeId, ParsingMode, ResourceLoader, ResourceRequest,
    FETCH_EXTERNAL_RESOURCES, SKIP_EXTERNAL_RESOURCES,
};
use url::Url;

fn doc_with_body() -> (Document, NodeId, NodeId) {
    let mut doc = Document::new(DocumentOptions::default()).unwrap();
    let html = doc.create_element("html").unwrap();
    let body = doc.create_element("body").unwrap();
    doc.append_child(doc.root(), html).unwrap();
    doc.append_child(html, body).unwrap();
    (doc, html, body)
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[test]
fn test_insert_ancestor_into_descendant() {
    let (mut doc, html, body) = doc_with_body();
    let err = doc.append_child(body, html).unwrap_err();
    assert_eq!(err.name(), "HierarchyRequestError");
}

#[test]
fn test_insert_into_text_node() {
    let (mut doc, _, body) = doc_with_body();
    let text = doc.create_text_node("leaf");
    doc.append_child(body, text).unwrap();
    let span = doc.create_element("span").unwrap();
    assert_eq!(
        doc.append_child(text, span).unwrap_err().name(),
        "HierarchyRequestError"
    );
}

#[test]
fn test_insert_document_node() {
    let (mut doc, _, body) = doc_with_body();
    let root = doc.root();
    assert_eq!(
        doc.append_child(body, root).unwrap_err().name(),
        "HierarchyRequestError"
    );
}

#[test]
fn test_second_document_element_rejected() {
    let (mut doc, _, _) = doc_with_body();
    let other = doc.create_element("html").unwrap();
    let root = doc.root();
    assert!(doc.append_child(root, other).is_err());
}

#[test]
fn test_remove_non_child() {
    let (mut doc, html, body) = doc_with_body();
    let stray = doc.create_element("p").unwrap();
    assert_eq!(doc.remove_child(body, stray).unwrap_err().name(), "NotFoundError");
    assert_eq!(doc.remove_child(body, html).unwrap_err().name(), "NotFoundError");
}

#[test]
fn test_failed_mutation_keeps_generation() {
    let (mut doc, html, body) = doc_with_body();
    let before = doc.generation();
    let _ = doc.append_child(body, html);
    assert_eq!(doc.generation(), before);
}

#[test]
fn test_replace_child() {
    let (mut doc, _, body) = doc_with_body();
    let a = doc.create_element("a").unwrap();
    let b = doc.create_element("b").unwrap();
    doc.append_child(body, a).unwrap();
    assert_eq!(doc.replace_child(body, b, a).unwrap(), a);
    assert_eq!(doc.first_element_child(body), Some(b));
    assert_eq!(doc.tree().parent(a), None);
}

#[test]
fn test_set_text_content_replaces_children() {
    let (mut doc, _, body) = doc_with_body();
    let p = doc.create_element("p").unwrap();
    doc.append_child(body, p).unwrap();
    doc.set_text_content(body, "plain").unwrap();
    assert_eq!(doc.child_element_count(body), 0);
    assert_eq!(doc.text_content(body).as_deref(), Some("plain"));
    assert_eq!(doc.text_content(doc.root()), None);
}

// ============================================================================
// NAMES AND ATTRIBUTES
// ============================================================================

#[test]
fn test_create_element_ns_prefix_rules() {
    let mut doc = Document::new(DocumentOptions::default()).unwrap();
    assert_eq!(
        doc.create_element_ns(None, "svg:rect").unwrap_err().name(),
        "NamespaceError"
    );
    let rect = doc.create_element_ns(Some(ns::SVG), "svg:rect").unwrap();
    let elem = doc.tree().element(rect).unwrap();
    assert_eq!(elem.prefix.as_deref(), Some("svg"));
    assert_eq!(elem.local_name, "rect");
}

#[test]
fn test_xml_document_keeps_case_and_null_namespace() {
    let mut doc = Document::new(DocumentOptions {
        parsing_mode: ParsingMode::Xml,
        content_type: "application/xml".into(),
        ..Default::default()
    })
    .unwrap();
    let el = doc.create_element("Item").unwrap();
    let elem = doc.tree().element(el).unwrap();
    assert_eq!(elem.local_name, "Item");
    assert_eq!(elem.namespace, None);
}

#[test]
fn test_html_attribute_names_lowercased() {
    let (mut doc, _, body) = doc_with_body();
    doc.set_attribute(body, "DATA-X", "1").unwrap();
    assert_eq!(doc.get_attribute(body, "data-x"), Some("1"));
    assert!(doc.has_attribute(body, "Data-X"));
    assert!(doc.remove_attribute(body, "data-X").unwrap());
    assert!(!doc.remove_attribute(body, "data-x").unwrap());
}

#[test]
fn test_get_element_by_id_first_in_order() {
    let (mut doc, _, body) = doc_with_body();
    let a = doc.create_element("div").unwrap();
    let b = doc.create_element("div").unwrap();
    doc.set_attribute(a, "id", "dup").unwrap();
    doc.set_attribute(b, "id", "dup").unwrap();
    doc.append_child(body, b).unwrap();
    doc.insert_before(body, a, Some(b)).unwrap();
    assert_eq!(doc.get_element_by_id("dup"), Some(a));
    assert_eq!(doc.get_element_by_id(""), None);
}

// ============================================================================
// DOCUMENT FEATURES AND LOADING
// ============================================================================

struct RecordingLoader {
    fetched: RefCell<Vec<(String, String)>>,
    aborted: Rc<Cell<u32>>,
}

struct AbortCounter(Rc<Cell<u32>>);

impl ResourceRequest for AbortCounter {
    fn abort(&self) {
        self.0.set(self.0.get() + 1);
    }
}

impl ResourceLoader for RecordingLoader {
    fn fetch(&self, url: &Url, tag: &str) -> Option<Box<dyn ResourceRequest>> {
        self.fetched
            .borrow_mut()
            .push((url.to_string(), tag.to_string()));
        Some(Box::new(AbortCounter(Rc::clone(&self.aborted))))
    }
}

fn loader() -> Rc<RecordingLoader> {
    Rc::new(RecordingLoader {
        fetched: RefCell::new(Vec::new()),
        aborted: Rc::new(Cell::new(0)),
    })
}

#[test]
fn test_default_features_fetch_scripts_only() {
    let loader = loader();
    let mut doc = Document::new(DocumentOptions {
        url: "https://example.com/".into(),
        resource_loader: Some(loader.clone()),
        ..Default::default()
    })
    .unwrap();
    let script = doc.create_element("script").unwrap();
    let img = doc.create_element("img").unwrap();

    assert!(doc.fetch_resource(script, "app.js").is_some());
    assert!(doc.fetch_resource(img, "a.png").is_none());
    assert_eq!(
        loader.fetched.borrow().as_slice(),
        &[("https://example.com/app.js".to_string(), "script".to_string())]
    );
    assert_eq!(doc.request_manager().size(), 1);

    doc.request_manager_mut().close();
    assert_eq!(loader.aborted.get(), 1);
    assert_eq!(doc.request_manager().size(), 0);
}

#[test]
fn test_feature_overrides() {
    let loader = loader();
    let features = DocumentFeatureOverrides::new()
        .with(FETCH_EXTERNAL_RESOURCES, FeatureSource::names(["img"]))
        .with("skipexternalresources", FeatureSource::One(FeatureValue::from("ads.")));
    let mut doc = Document::new(DocumentOptions {
        url: "https://example.com/".into(),
        resource_loader: Some(loader.clone()),
        features,
        ..Default::default()
    })
    .unwrap();
    let img = doc.create_element("img").unwrap();
    let script = doc.create_element("script").unwrap();

    assert!(doc.features().has(FETCH_EXTERNAL_RESOURCES, "IMG"));
    assert!(doc.features().is_set(SKIP_EXTERNAL_RESOURCES));
    assert!(doc.fetch_resource(img, "/a.png").is_some());
    assert!(doc.fetch_resource(img, "https://ads.example.net/b.png").is_none());
    assert!(doc.fetch_resource(script, "/x.js").is_none());
}

#[test]
fn test_fetch_without_loader() {
    let mut doc = Document::new(DocumentOptions::default()).unwrap();
    let script = doc.create_element("script").unwrap();
    assert!(doc.fetch_resource(script, "https://example.com/a.js").is_none());
}

#[test]
fn test_cookies_through_jar() {
    let jar = Rc::new(MemoryCookieJar::new());
    let doc = Document::new(DocumentOptions {
        url: "https://example.com/".into(),
        cookie_jar: Some(jar.clone()),
        ..Default::default()
    })
    .unwrap();
    doc.set_cookie("a=1; Path=/");
    doc.set_cookie("b=2");
    assert_eq!(doc.cookie(), "a=1; b=2");

    let other = Url::parse("https://other.org/").unwrap();
    assert_eq!(jar.cookie_string(&other), "");
}

#[test]
fn test_cookie_without_jar_is_empty() {
    let doc = Document::new(DocumentOptions::default()).unwrap();
    doc.set_cookie("a=1");
    assert_eq!(doc.cookie(), "");
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_dispatch_collects_errors_and_continues() {
    let mut doc = Document::new(DocumentOptions::default()).unwrap();
    let seen = Rc::new(Cell::new(0));

    doc.listeners_mut()
        .add("load", Rc::new(|_: &Event| anyhow::bail!("first listener failed")));
    let counter = Rc::clone(&seen);
    doc.listeners_mut().add(
        "load",
        Rc::new(move |_: &Event| {
            counter.set(counter.get() + 1);
            Ok(())
        }),
    );

    let errors = doc.dispatch_event(&Event::new("load"));
    assert_eq!(errors.len(), 1);
    assert_eq!(seen.get(), 1);
    assert!(doc.dispatch_event(&Event::new("other")).is_empty());
}

#[test]
fn test_document_ids_are_unique() {
    let a = Document::new(DocumentOptions::default()).unwrap();
    let b = Document::new(DocumentOptions::default()).unwrap();
    assert_ne!(a.id(), b.id());
    assert_eq!(a.origin(), "null");
}
