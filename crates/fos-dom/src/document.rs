//! Document - High-level document API
//!
//! All structural mutation goes through `Document` so that node iterators
//! see removals before they happen. The tree itself bumps the generation;
//! collections, the id index and the selector cache validate against it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use crate::{
    apply_document_features, invoke_listeners, ns, Cached, CollectionId, CookieJar,
    CssSelectorMatcher, DocumentFeatureOverrides, DomError, DomTree, ElementData,
    ElementRegistry, Event, EventListeners, FeatureSet, LiveCollection, NodeId,
    NodeIteratorId, NodeIterators, Predicate, PreserveAspectRatio, QueryCache, QueryKey,
    QueryType, ReflectedValue, ReflectionRule, ReflectionTable, RequestId, RequestManager,
    ResourceLoader, SelectorMatcher, TokenList, Traversal, WhatToShow,
};

/// Process-unique document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Which parser semantics the document follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsingMode {
    #[default]
    Html,
    Xml,
}

/// `document.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Interactive => "interactive",
            Self::Complete => "complete",
        }
    }
}

/// Document construction options
#[derive(Clone)]
pub struct DocumentOptions {
    pub parsing_mode: ParsingMode,
    pub content_type: String,
    pub encoding: String,
    pub url: String,
    pub referrer: String,
    pub features: DocumentFeatureOverrides,
    pub cookie_jar: Option<Rc<dyn CookieJar>>,
    pub resource_loader: Option<Rc<dyn ResourceLoader>>,
    /// Working `NodeIterator` limit
    pub concurrent_node_iterators: usize,
    /// Controls `hidden` / `visibility_state`
    pub pretend_to_be_visual: bool,
    /// Defaults to [`CssSelectorMatcher`]
    pub selector_matcher: Option<Rc<dyn SelectorMatcher>>,
    pub query_cache_entries: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            parsing_mode: ParsingMode::Html,
            content_type: "text/html".to_string(),
            encoding: "UTF-8".to_string(),
            url: "about:blank".to_string(),
            referrer: String::new(),
            features: DocumentFeatureOverrides::default(),
            cookie_jar: None,
            resource_loader: None,
            concurrent_node_iterators: 10,
            pretend_to_be_visual: false,
            selector_matcher: None,
            query_cache_entries: crate::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("parsing_mode", &self.parsing_mode)
            .field("content_type", &self.content_type)
            .field("url", &self.url)
            .field("concurrent_node_iterators", &self.concurrent_node_iterators)
            .field("pretend_to_be_visual", &self.pretend_to_be_visual)
            .finish_non_exhaustive()
    }
}

/// Memo keys for collections created through the ParentNode / Document API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CollectionKey {
    Children(NodeId),
    TagName(NodeId, String),
    ClassNames(NodeId, String),
    Named(String),
}

/// HTML or XML document
pub struct Document {
    tree: DomTree,
    id: DocumentId,
    url: Url,
    parsing_mode: ParsingMode,
    content_type: String,
    encoding: String,
    referrer: String,
    ready_state: ReadyState,
    features: FeatureSet,
    registry: &'static ElementRegistry,
    collections: RefCell<Vec<LiveCollection>>,
    collection_memo: RefCell<HashMap<CollectionKey, CollectionId>>,
    queries: RefCell<QueryCache>,
    id_index: RefCell<Option<Cached<HashMap<String, NodeId>>>>,
    matcher: Rc<dyn SelectorMatcher>,
    listeners: EventListeners,
    requests: RequestManager,
    node_iterators: NodeIterators,
    cookie_jar: Option<Rc<dyn CookieJar>>,
    resource_loader: Option<Rc<dyn ResourceLoader>>,
    pretend_to_be_visual: bool,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("parsing_mode", &self.parsing_mode)
            .field("ready_state", &self.ready_state)
            .field("nodes", &self.tree.len())
            .finish_non_exhaustive()
    }
}

/// XML `Name` production, restricted to what element names need
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || first == ':' || !first.is_ascii();
    start_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':') || !c.is_ascii())
}

impl Document {
    /// Create an empty document (no document element)
    pub fn new(options: DocumentOptions) -> Result<Self, DomError> {
        let url = Url::parse(&options.url)
            .map_err(|e| DomError::Syntax(format!("Invalid document URL '{}': {e}", options.url)))?;

        let mut features = FeatureSet::new();
        apply_document_features(&mut features, &options.features);

        let matcher = options
            .selector_matcher
            .unwrap_or_else(|| Rc::new(CssSelectorMatcher::new()));

        let doc = Self {
            tree: DomTree::new(),
            id: DocumentId::next(),
            url,
            parsing_mode: options.parsing_mode,
            content_type: options.content_type,
            encoding: options.encoding,
            referrer: options.referrer,
            ready_state: ReadyState::Loading,
            features,
            registry: ElementRegistry::shared(),
            collections: RefCell::new(Vec::new()),
            collection_memo: RefCell::new(HashMap::new()),
            queries: RefCell::new(QueryCache::new(options.query_cache_entries)),
            id_index: RefCell::new(None),
            matcher,
            listeners: EventListeners::new(),
            requests: RequestManager::new(),
            node_iterators: NodeIterators::new(options.concurrent_node_iterators),
            cookie_jar: options.cookie_jar,
            resource_loader: options.resource_loader,
            pretend_to_be_visual: options.pretend_to_be_visual,
        };
        tracing::debug!(id = doc.id.0, url = %doc.url, "Document created");
        Ok(doc)
    }

    /// Replace the feature set (used for scripting-disabled documents)
    pub fn set_features(&mut self, features: FeatureSet) {
        self.features = features;
    }

    // ----- identity and metadata -----

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Mutable tree access for attribute and character-data edits
    /// (structural mutators are only reachable through `Document`)
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn generation(&self) -> crate::Generation {
        self.tree.generation()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Set the document URL (history state changes)
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    /// ASCII serialization of the document origin
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn parsing_mode(&self) -> ParsingMode {
        self.parsing_mode
    }

    pub fn is_html(&self) -> bool {
        self.parsing_mode == ParsingMode::Html
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn registry(&self) -> &'static ElementRegistry {
        self.registry
    }

    // ----- ready state -----

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        if self.ready_state != state {
            tracing::debug!(id = self.id.0, state = state.as_str(), "Ready state changed");
            self.ready_state = state;
        }
    }

    /// Mark the document complete; returns whether the state changed
    pub fn close(&mut self) -> bool {
        let changed = self.ready_state != ReadyState::Complete;
        self.set_ready_state(ReadyState::Complete);
        changed
    }

    /// `document.hidden`
    pub fn hidden(&self) -> bool {
        !self.pretend_to_be_visual
    }

    /// `document.visibilityState`
    pub fn visibility_state(&self) -> &'static str {
        if self.pretend_to_be_visual {
            "visible"
        } else {
            "prerender"
        }
    }

    // ----- node creation -----

    /// `createElement`: lowercased in HTML documents
    pub fn create_element(&mut self, local_name: &str) -> Result<NodeId, DomError> {
        if !is_valid_name(local_name) {
            return Err(DomError::InvalidCharacter(format!(
                "\"{local_name}\" is not a valid element name"
            )));
        }
        let html_namespace = self.is_html() || self.content_type == "application/xhtml+xml";
        let (namespace, local) = if self.is_html() {
            (Some(ns::HTML), local_name.to_ascii_lowercase())
        } else if html_namespace {
            (Some(ns::HTML), local_name.to_string())
        } else {
            (None, local_name.to_string())
        };
        Ok(self.create_element_raw(namespace, None, &local))
    }

    /// `createElementNS`
    pub fn create_element_ns(
        &mut self,
        namespace: Option<&str>,
        qualified_name: &str,
    ) -> Result<NodeId, DomError> {
        if !is_valid_name(qualified_name) {
            return Err(DomError::InvalidCharacter(format!(
                "\"{qualified_name}\" is not a valid qualified name"
            )));
        }
        let namespace = namespace.filter(|n| !n.is_empty());
        let (prefix, local) = match qualified_name.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, qualified_name),
        };
        if prefix.is_some() && namespace.is_none() {
            return Err(DomError::Namespace(format!(
                "Prefix in \"{qualified_name}\" requires a namespace"
            )));
        }
        if prefix == Some("xml") && namespace != Some(ns::XML) {
            return Err(DomError::Namespace("The xml prefix requires the XML namespace".into()));
        }
        Ok(self.create_element_raw(namespace, prefix, local))
    }

    /// Create an element with no name validation (parser entry point)
    pub fn create_element_raw(
        &mut self,
        namespace: Option<&str>,
        prefix: Option<&str>,
        local_name: &str,
    ) -> NodeId {
        let interface = self.registry.interface_for(namespace, local_name);
        self.tree
            .create_element(ElementData::new(namespace, prefix, local_name, interface))
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        self.tree.create_text(data)
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.tree.create_comment(data)
    }

    pub fn create_processing_instruction(
        &mut self,
        target: &str,
        data: &str,
    ) -> Result<NodeId, DomError> {
        if !is_valid_name(target) || data.contains("?>") {
            return Err(DomError::InvalidCharacter(format!(
                "Invalid processing instruction target or data: {target}"
            )));
        }
        Ok(self.tree.create_processing_instruction(target, data))
    }

    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.tree.create_doctype(name, public_id, system_id)
    }

    // ----- structural mutation -----

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert (or move) `child` before `reference`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        self.tree.validate_insertion(parent, child, reference, None)?;
        // a move detaches first
        if self.tree.parent(child).is_some() {
            self.node_iterators.pre_remove(&self.tree, child);
        }
        self.tree.insert_before(parent, child, reference)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        if self.tree.parent(child) != Some(parent) {
            return Err(DomError::NotFound(
                "The node to be removed is not a child of this node".into(),
            ));
        }
        self.node_iterators.pre_remove(&self.tree, child);
        self.tree.remove_child(parent, child)
    }

    /// `replaceChild`: returns the removed node
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<NodeId, DomError> {
        if self.tree.parent(old_child) != Some(parent) {
            return Err(DomError::NotFound(
                "The node to be replaced is not a child of this node".into(),
            ));
        }
        if new_child == old_child {
            return Ok(old_child);
        }
        let reference = self.tree.next_sibling(old_child);
        let reference = if reference == Some(new_child) {
            self.tree.next_sibling(new_child)
        } else {
            reference
        };
        self.tree
            .validate_insertion(parent, new_child, reference, Some(old_child))?;
        self.remove_child(parent, old_child)?;
        if let Err(e) = self.insert_before(parent, new_child, reference) {
            // restore the old child before reporting
            self.tree.insert_before(parent, old_child, reference)?;
            return Err(e);
        }
        Ok(old_child)
    }

    /// Remove every child of `parent`
    pub fn remove_all_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.tree.children(parent).map(|(id, _)| id).collect();
        for child in children {
            self.node_iterators.pre_remove(&self.tree, child);
        }
        self.tree.remove_all_children(parent);
    }

    /// `textContent` setter
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        if self.tree.get(id).is_some_and(|n| n.is_container()) {
            let children: Vec<NodeId> = self.tree.children(id).map(|(c, _)| c).collect();
            for child in children {
                self.node_iterators.pre_remove(&self.tree, child);
            }
        }
        self.tree.set_text_content(id, text)
    }

    pub fn text_content(&self, id: NodeId) -> Option<String> {
        self.tree.text_content(id)
    }

    pub fn set_character_data(&mut self, id: NodeId, data: &str) -> Result<(), DomError> {
        self.tree.set_character_data(id, data)
    }

    // ----- attributes -----

    /// HTML elements in HTML documents match attribute names lowercased
    fn attribute_name<'a>(&self, element: NodeId, name: &'a str) -> std::borrow::Cow<'a, str> {
        let lower = self.is_html() && self.tree.element(element).is_some_and(ElementData::is_html);
        if lower && name.bytes().any(|b| b.is_ascii_uppercase()) {
            std::borrow::Cow::Owned(name.to_ascii_lowercase())
        } else {
            std::borrow::Cow::Borrowed(name)
        }
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        let name = self.attribute_name(element, name);
        self.tree.get_attribute(element, &name)
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidCharacter(format!(
                "\"{name}\" is not a valid attribute name"
            )));
        }
        let name = self.attribute_name(element, name).into_owned();
        self.tree.set_attribute(element, &name, value)
    }

    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<bool, DomError> {
        let name = self.attribute_name(element, name).into_owned();
        self.tree.remove_attribute(element, &name)
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.get_attribute(element, name).is_some()
    }

    pub fn get_attribute_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<&str> {
        self.tree.get_attribute_ns(element, namespace, local_name)
    }

    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        self.tree
            .set_attribute_ns(element, namespace, qualified_name, value)
    }

    pub fn remove_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<bool, DomError> {
        self.tree.remove_attribute_ns(element, namespace, local_name)
    }

    // ----- well-known elements -----

    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.document_element()
    }

    fn html_child(&self, names: &[&str]) -> Option<NodeId> {
        let html = self.document_element()?;
        if !self.tree.element(html)?.is(ns::HTML, "html") {
            return None;
        }
        self.tree.child_elements(html).find(|&id| {
            self.tree
                .element(id)
                .is_some_and(|e| names.iter().any(|n| e.is(ns::HTML, n)))
        })
    }

    /// `document.head`
    pub fn head(&self) -> Option<NodeId> {
        self.html_child(&["head"])
    }

    /// `document.body`
    pub fn body(&self) -> Option<NodeId> {
        self.html_child(&["body", "frameset"])
    }

    /// `document.title`, whitespace-collapsed
    pub fn title(&self) -> String {
        let title = self.tree.descendants(self.root()).find(|(_, node)| {
            node.as_element().is_some_and(|e| {
                e.local_name == "title"
                    && matches!(e.namespace.as_deref(), Some(ns::HTML) | Some(ns::SVG))
            })
        });
        title
            .and_then(|(id, _)| self.tree.text_content(id))
            .map(|text| text.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    // ----- id index -----

    /// `getElementById`: first connected element in document order
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        let generation = self.tree.generation();
        let mut index = self.id_index.borrow_mut();
        let fresh = index.as_ref().is_some_and(|c| c.is_valid(generation));
        if !fresh {
            tracing::trace!(generation = generation.value(), "Rebuilding id index");
            let mut map = HashMap::new();
            for (node_id, node) in self.tree.descendants(self.root()) {
                if let Some(value) = node.as_element().and_then(ElementData::id) {
                    map.entry(value.to_string()).or_insert(node_id);
                }
            }
            match index.as_mut() {
                Some(cached) => cached.update(map, generation),
                None => *index = Some(Cached::new(map, generation)),
            }
        }
        index.as_ref().and_then(|c| c.get().get(id).copied())
    }

    // ----- live collections -----

    /// Register a collection; the handle stays valid for the document's life
    pub fn create_collection(
        &self,
        root: NodeId,
        traversal: Traversal,
        predicate: Predicate,
    ) -> CollectionId {
        let mut collections = self.collections.borrow_mut();
        collections.push(LiveCollection::new(root, traversal, predicate));
        CollectionId(collections.len() - 1)
    }

    fn memoized_collection(
        &self,
        key: CollectionKey,
        make: impl FnOnce() -> (NodeId, Traversal, Predicate),
    ) -> CollectionId {
        if let Some(&id) = self.collection_memo.borrow().get(&key) {
            return id;
        }
        let (root, traversal, predicate) = make();
        let id = self.create_collection(root, traversal, predicate);
        self.collection_memo.borrow_mut().insert(key, id);
        id
    }

    /// `ParentNode.children`: one live collection per parent
    pub fn children(&self, parent: NodeId) -> CollectionId {
        self.memoized_collection(CollectionKey::Children(parent), || {
            (parent, Traversal::Children, Predicate::Elements)
        })
    }

    /// `getElementsByTagName`
    pub fn get_elements_by_tag_name(&self, root: NodeId, qualified_name: &str) -> CollectionId {
        let key = CollectionKey::TagName(root, qualified_name.to_string());
        self.memoized_collection(key, || {
            (
                root,
                Traversal::Descendants,
                Predicate::LocalName(qualified_name.to_string()),
            )
        })
    }

    /// `getElementsByClassName`
    pub fn get_elements_by_class_name(&self, root: NodeId, class_names: &str) -> CollectionId {
        let key = CollectionKey::ClassNames(root, class_names.to_string());
        self.memoized_collection(key, || {
            (root, Traversal::Descendants, Predicate::class_names(class_names))
        })
    }

    /// Named-object collection for `name` over the whole document
    pub fn named_objects(&self, name: &str) -> CollectionId {
        self.memoized_collection(CollectionKey::Named(name.to_string()), || {
            (
                self.root(),
                Traversal::Descendants,
                Predicate::NamedObject(name.to_string()),
            )
        })
    }

    /// Current members of a collection
    pub fn collection_items(&self, id: CollectionId) -> Rc<[NodeId]> {
        self.collections
            .borrow()
            .get(id.0)
            .map(|c| c.items(&self.tree))
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }

    pub fn collection_len(&self, id: CollectionId) -> usize {
        self.collection_items(id).len()
    }

    pub fn collection_item(&self, id: CollectionId, index: usize) -> Option<NodeId> {
        self.collection_items(id).get(index).copied()
    }

    /// `namedItem`: first member whose id or name equals `key`
    pub fn collection_named_item(&self, id: CollectionId, key: &str) -> Option<NodeId> {
        self.collections
            .borrow()
            .get(id.0)
            .and_then(|c| c.named_item(&self.tree, key))
    }

    /// Number of collections created so far
    pub fn collection_count(&self) -> usize {
        self.collections.borrow().len()
    }

    pub fn first_element_child(&self, parent: NodeId) -> Option<NodeId> {
        self.tree.first_element_child(parent)
    }

    pub fn last_element_child(&self, parent: NodeId) -> Option<NodeId> {
        self.tree.last_element_child(parent)
    }

    pub fn child_element_count(&self, parent: NodeId) -> usize {
        self.tree.child_element_count(parent)
    }

    // ----- selectors -----

    fn query_is_trivially_empty(&self, scope: NodeId) -> bool {
        !self.tree.has_children(scope)
            || (scope == self.root() && self.document_element().is_none())
    }

    fn run_query(&self, scope: NodeId, selectors: &str, kind: QueryType) -> Result<Rc<[NodeId]>, DomError> {
        let generation = self.tree.generation();
        let key = QueryKey::new(scope, selectors, kind);
        if let Some(hit) = self.queries.borrow_mut().get(&key, generation) {
            return Ok(hit);
        }

        let results: Rc<[NodeId]> = match kind {
            QueryType::First => self
                .matcher
                .first(&self.tree, scope, selectors)?
                .into_iter()
                .collect(),
            QueryType::All => self.matcher.select(&self.tree, scope, selectors)?.into(),
        };
        self.queries
            .borrow_mut()
            .set(key, Rc::clone(&results), generation);
        Ok(results)
    }

    /// `querySelector`
    pub fn query_selector(&self, scope: NodeId, selectors: &str) -> Result<Option<NodeId>, DomError> {
        if self.query_is_trivially_empty(scope) {
            return Ok(None);
        }
        Ok(self.run_query(scope, selectors, QueryType::First)?.first().copied())
    }

    /// `querySelectorAll`
    pub fn query_selector_all(&self, scope: NodeId, selectors: &str) -> Result<Rc<[NodeId]>, DomError> {
        if self.query_is_trivially_empty(scope) {
            return Ok(Rc::from(Vec::new()));
        }
        self.run_query(scope, selectors, QueryType::All)
    }

    /// `Element.matches`
    pub fn matches(&self, element: NodeId, selectors: &str) -> Result<bool, DomError> {
        if self.tree.element(element).is_none() {
            return Ok(false);
        }
        Ok(self.matcher.matches(&self.tree, element, selectors)?)
    }

    /// `Element.closest`
    pub fn closest(&self, element: NodeId, selectors: &str) -> Result<Option<NodeId>, DomError> {
        let mut cursor = Some(element);
        while let Some(id) = cursor {
            if self.matches(id, selectors)? {
                return Ok(Some(id));
            }
            cursor = self.tree.parent(id);
        }
        Ok(None)
    }

    pub fn query_cache_stats(&self) -> crate::CacheStats {
        self.queries.borrow().stats()
    }

    // ----- reflection -----

    fn rule(&self, element: NodeId, property: &str) -> Result<&'static ReflectionRule, DomError> {
        let elem = self
            .tree
            .element(element)
            .ok_or_else(|| DomError::Type("Reflection target is not an element".into()))?;
        ReflectionTable::shared()
            .lookup(elem.interface, property)
            .ok_or_else(|| {
                DomError::Type(format!(
                    "'{property}' is not a reflected property of {}",
                    elem.interface.name()
                ))
            })
    }

    /// Read a reflected IDL property
    pub fn reflect_get(&self, element: NodeId, property: &str) -> Result<ReflectedValue, DomError> {
        let rule = self.rule(element, property)?;
        Ok(rule.read(&self.tree, element, Some(&self.url)))
    }

    /// Write a reflected IDL property
    pub fn reflect_set(
        &mut self,
        element: NodeId,
        property: &str,
        value: impl Into<ReflectedValue>,
    ) -> Result<(), DomError> {
        let rule = self.rule(element, property)?;
        rule.write(&mut self.tree, element, value.into())
    }

    /// Token-list view (`classList`-style) of a reflected list property
    pub fn token_list(&self, element: NodeId, property: &str) -> Result<TokenList, DomError> {
        let rule = self.rule(element, property)?;
        TokenList::for_rule(element, rule)
            .ok_or_else(|| DomError::Type(format!("'{property}' is not a token list")))
    }

    /// `preserveAspectRatio` as (`baseVal`, `animVal`)
    pub fn preserve_aspect_ratio(
        &self,
        element: NodeId,
    ) -> Result<(PreserveAspectRatio, PreserveAspectRatio), DomError> {
        self.rule(element, "preserveAspectRatio")?;
        Ok((
            PreserveAspectRatio::base_val(element),
            PreserveAspectRatio::anim_val(element),
        ))
    }

    // ----- node iterators -----

    /// `createNodeIterator`
    pub fn create_node_iterator(&mut self, root: NodeId, what_to_show: WhatToShow) -> NodeIteratorId {
        self.node_iterators.create(root, what_to_show)
    }

    pub fn next_node(&mut self, iterator: NodeIteratorId) -> Result<Option<NodeId>, DomError> {
        self.node_iterators.next_node(&self.tree, iterator)
    }

    pub fn previous_node(&mut self, iterator: NodeIteratorId) -> Result<Option<NodeId>, DomError> {
        self.node_iterators.previous_node(&self.tree, iterator)
    }

    // ----- events -----

    pub fn listeners(&self) -> &EventListeners {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut EventListeners {
        &mut self.listeners
    }

    /// Invoke listeners for `event`; errors are collected, not raised
    pub fn dispatch_event(&self, event: &Event) -> Vec<anyhow::Error> {
        let listeners = self.listeners.listeners_for(&event.event_type);
        invoke_listeners(&listeners, event)
    }

    // ----- resources -----

    /// Hand `url` to the loader if document features allow `element` to fetch it
    pub fn fetch_resource(&mut self, element: NodeId, url: &str) -> Option<RequestId> {
        let tag = self.tree.element(element)?.local_name.clone();
        let resolved = self.url.join(url).ok()?;
        if !self.features.allows_fetch(&tag, resolved.as_str()) {
            tracing::trace!(%tag, url = %resolved, "Resource fetch skipped by document features");
            return None;
        }
        let loader = self.resource_loader.clone()?;
        let request = loader.fetch(&resolved, &tag)?;
        Some(self.requests.add(request))
    }

    pub fn request_manager(&self) -> &RequestManager {
        &self.requests
    }

    pub fn request_manager_mut(&mut self) -> &mut RequestManager {
        &mut self.requests
    }

    /// `document.cookie` getter
    pub fn cookie(&self) -> String {
        self.cookie_jar
            .as_ref()
            .map(|jar| jar.cookie_string(&self.url))
            .unwrap_or_default()
    }

    /// `document.cookie` setter
    pub fn set_cookie(&self, cookie: &str) {
        if let Some(jar) = &self.cookie_jar {
            jar.set_cookie(cookie, &self.url);
        }
    }
}
