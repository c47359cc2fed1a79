//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree with generation-validated caches:
//! live collections, the id index and selector query results are all
//! recomputed lazily when the document generation moves.
//!
//! # Example
//! ```rust,ignore
//! use fos_dom::{Document, DocumentOptions};
//!
//! let mut doc = Document::new(DocumentOptions::default())?;
//! let html = doc.create_element("html")?;
//! doc.append_child(doc.root(), html)?;
//! let children = doc.children(doc.root());
//! assert_eq!(doc.collection_len(children), 1);
//! ```

mod collection;
mod document;
mod element_registry;
mod error;
mod events;
mod features;
mod generation;
mod loader;
mod node;
mod query_cache;
mod reflect;
mod selectors;
mod traversal;
mod tree;

pub use collection::{CollectionId, LiveCollection, Predicate, Traversal};
pub use document::{Document, DocumentId, DocumentOptions, ParsingMode, ReadyState};
pub use element_registry::{ElementInterface, ElementRegistry};
pub use error::{DomError, SelectorError};
pub use events::{invoke_listeners, Event, EventDetail, EventListeners, Listener, ListenerId};
pub use features::{
    apply_document_features, DocumentFeatureOverrides, FeatureSet, FeatureSource, FeatureValue,
    FETCH_EXTERNAL_RESOURCES, SKIP_EXTERNAL_RESOURCES,
};
pub use generation::{Cached, Generation, GenerationSource};
pub use loader::{
    CookieJar, MemoryCookieJar, RequestId, RequestManager, ResourceLoader, ResourceRequest,
};
pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use query_cache::{CacheStats, QueryCache, QueryKey, QueryType, DEFAULT_MAX_ENTRIES};
pub use reflect::{
    AspectRatio, AspectRatioAlign, Coercion, MeetOrSlice, PreserveAspectRatio, ReflectedValue, ReflectionRule,
    ReflectionTable, TokenList, TokenSeparator,
};
pub use selectors::{CssSelectorMatcher, NthExpression, SelectorList, SelectorMatcher};
pub use traversal::{NodeIteratorId, NodeIterators, WhatToShow};
pub use tree::{Children, Descendants, DomTree};

/// Well-known namespace URIs
pub mod ns {
    /// XHTML namespace
    pub const HTML: &str = "http://www.w3.org/1999/xhtml";
    /// SVG namespace
    pub const SVG: &str = "http://www.w3.org/2000/svg";
    /// MathML namespace
    pub const MATHML: &str = "http://www.w3.org/1998/Math/MathML";
    /// `xml:` prefix namespace
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// `xmlns` namespace
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    /// Namespace of the synthetic `parsererror` element
    pub const PARSER_ERROR: &str = "http://www.mozilla.org/newlayout/xml/parsererror.xml";
}

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID (the document node)
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node" in intrusive links
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this is not the sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert a sentinel-encoded link into an `Option`
    #[inline]
    pub(crate) fn get(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}
