//! DOM Node
//!
//! Nodes live in the `DomTree` arena and link to each other through
//! `NodeId`s (4 bytes) instead of pointers. Navigation to parent, first/last
//! child and siblings is O(1).

use crate::{ns, ElementInterface, NodeId};

/// DOM node type, numbered as in `Node.nodeType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub(crate) parent: NodeId,
    /// First child
    pub(crate) first_child: NodeId,
    /// Last child (for O(1) append)
    pub(crate) last_child: NodeId,
    /// Previous sibling
    pub(crate) prev_sibling: NodeId,
    /// Next sibling
    pub(crate) next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    /// Create a detached node around `data`
    pub fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::new(NodeData::Document)
    }

    /// Parent node, if attached
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.get()
    }

    /// First child
    #[inline]
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child.get()
    }

    /// Last child
    #[inline]
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child.get()
    }

    /// Previous sibling
    #[inline]
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling.get()
    }

    /// Next sibling
    #[inline]
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling.get()
    }

    /// Node type tag
    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Doctype { .. } => NodeType::DocumentType,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Whether this node may have children
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Character data of text, comment and processing-instruction nodes
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) | NodeData::Comment(s) => Some(s),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
    /// Processing instruction
    ProcessingInstruction { target: String, data: String },
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Namespace URI (`None` for the null namespace)
    pub namespace: Option<String>,
    /// Namespace prefix
    pub prefix: Option<String>,
    /// Local name
    pub local_name: String,
    /// Interface resolved from the element-construction table
    pub interface: ElementInterface,
    /// Attributes in insertion order, unique per (namespace, local name)
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(
        namespace: Option<&str>,
        prefix: Option<&str>,
        local_name: &str,
        interface: ElementInterface,
    ) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            interface,
            attrs: Vec::new(),
        }
    }

    /// Whether the element is in the HTML namespace
    #[inline]
    pub fn is_html(&self) -> bool {
        self.namespace.as_deref() == Some(ns::HTML)
    }

    /// Check namespace and local name together
    #[inline]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }

    /// Qualified name (`prefix:local` or `local`)
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// `tagName`: the qualified name, uppercased for HTML elements
    pub fn tag_name(&self) -> String {
        let name = self.qualified_name();
        if self.is_html() {
            name.to_ascii_uppercase()
        } else {
            name
        }
    }

    /// Get an attribute value by qualified name (first match)
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.qualified_name_is(name))
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by namespace and local name
    pub fn get_attr_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.namespace.as_deref() == namespace && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Element `id` attribute
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.get_attr_ns(None, "id")
    }

    /// Class tokens from the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attr_ns(None, "class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// Attribute in the null namespace
    pub fn new(local_name: &str, value: &str) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local_name: local_name.to_string(),
            value: value.to_string(),
        }
    }

    /// Qualified name (`prefix:local` or `local`)
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    fn qualified_name_is(&self, name: &str) -> bool {
        match &self.prefix {
            Some(prefix) => name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                == Some(self.local_name.as_str()),
            None => self.local_name == name,
        }
    }
}
