//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a removed node stays in the arena, detached, and
//! can be reinserted. Every structural, attribute or character-data mutation
//! bumps the tree generation before returning.
//!
//! Structural mutation is crate-private: `Document` wraps it so removals run
//! the node-iterator pre-removing steps.

use crate::{
    Attribute, DomError, ElementData, Generation, GenerationSource, Node, NodeData, NodeId,
};

/// Arena-based DOM tree for memory efficiency
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    generation: GenerationSource,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            generation: GenerationSource::new(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Element data of `id`, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current mutation generation
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    // ----- creation -----

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.push(NodeData::Element(data))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    /// Create a detached doctype
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(NodeData::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    /// Create a detached processing instruction
    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.push(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    // ----- navigation -----

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent()
    }

    /// First child of `id`
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child()
    }

    /// Last child of `id`
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child()
    }

    /// Next sibling of `id`
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling()
    }

    /// Previous sibling of `id`
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling()
    }

    /// Whether `id` has any child
    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    /// Direct children of `parent`, in order
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(parent),
        }
    }

    /// Element children of `parent`, in order
    pub fn child_elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
    }

    /// Descendants of `root` (excluding `root`) in preorder
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            next: self.first_child(root),
        }
    }

    /// First element child of `parent`
    pub fn first_element_child(&self, parent: NodeId) -> Option<NodeId> {
        self.child_elements(parent).next()
    }

    /// Last element child of `parent`
    pub fn last_element_child(&self, parent: NodeId) -> Option<NodeId> {
        let mut cursor = self.last_child(parent);
        while let Some(id) = cursor {
            if self.get(id).is_some_and(Node::is_element) {
                return Some(id);
            }
            cursor = self.previous_sibling(id);
        }
        None
    }

    /// Number of element children of `parent`
    pub fn child_element_count(&self, parent: NodeId) -> usize {
        self.child_elements(parent).count()
    }

    /// Document element (first element child of the document node)
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_element_child(NodeId::ROOT)
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// Whether `id` is connected to the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(NodeId::ROOT, id)
    }

    // ----- structural mutation -----

    /// Append `child` as the last child of `parent`
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    ///
    /// A `child` that is already attached is moved.
    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        self.validate_insertion(parent, child, reference, None)?;

        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child),
            other => other,
        };

        if self.parent(child).is_some() {
            self.detach(child);
        }

        let prev = match reference {
            Some(r) => self.nodes[r.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        let next = reference.unwrap_or(NodeId::NONE);

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        match prev.get() {
            Some(p) => self.nodes[p.index()].next_sibling = child,
            None => self.nodes[parent.index()].first_child = child,
        }
        match next.get() {
            Some(n) => self.nodes[n.index()].prev_sibling = child,
            None => self.nodes[parent.index()].last_child = child,
        }

        self.generation.bump();
        Ok(child)
    }

    /// Remove `child` from `parent`
    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        if self.get(parent).is_none() || self.parent(child) != Some(parent) {
            return Err(DomError::NotFound(
                "The node to be removed is not a child of this node".into(),
            ));
        }
        self.detach(child);
        self.generation.bump();
        Ok(child)
    }

    /// Remove every child of `parent`
    pub(crate) fn remove_all_children(&mut self, parent: NodeId) {
        let mut removed = false;
        while let Some(child) = self.first_child(parent) {
            self.detach(child);
            removed = true;
        }
        if removed {
            self.generation.bump();
        }
    }

    /// Pre-insertion validity; `replacing` is treated as already removed
    pub(crate) fn validate_insertion(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
        replacing: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_node = self
            .get(parent)
            .ok_or_else(|| DomError::NotFound("Unknown parent node".into()))?;
        let child_node = self
            .get(child)
            .ok_or_else(|| DomError::NotFound("Unknown node".into()))?;

        if !parent_node.is_container() {
            return Err(DomError::HierarchyRequest(
                "This node type does not support children".into(),
            ));
        }
        if matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest(
                "A document cannot be inserted".into(),
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(
                "The new child is an ancestor of the parent".into(),
            ));
        }
        if reference.is_some_and(|r| self.parent(r) != Some(parent)) {
            return Err(DomError::NotFound(
                "The reference node is not a child of this node".into(),
            ));
        }

        let into_document = matches!(parent_node.data, NodeData::Document);
        match &child_node.data {
            NodeData::Text(_) if into_document => Err(DomError::HierarchyRequest(
                "Text nodes cannot be children of a document".into(),
            )),
            NodeData::Doctype { .. } if !into_document => Err(DomError::HierarchyRequest(
                "A doctype can only be a child of a document".into(),
            )),
            NodeData::Element(_)
                if into_document
                    && self
                        .child_elements(parent)
                        .any(|existing| existing != child && Some(existing) != replacing) =>
            {
                Err(DomError::HierarchyRequest(
                    "The document already has a document element".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn detach(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent.get() else {
            return;
        };
        match prev.get() {
            Some(p) => self.nodes[p.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next.get() {
            Some(n) => self.nodes[n.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }
        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    // ----- attributes -----

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Node::as_element_mut)
            .ok_or_else(|| DomError::Type("The node is not an element".into()))
    }

    /// Attribute value by qualified name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    /// Attribute value by namespace and local name
    pub fn get_attribute_ns(
        &self,
        id: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<&str> {
        self.element(id)?.get_attr_ns(namespace, local_name)
    }

    /// Set an attribute by qualified name, creating it in the null namespace
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let elem = self.element_mut(id)?;
        match elem.attrs.iter_mut().find(|a| a.qualified_name() == name) {
            Some(attr) => attr.value = value.to_string(),
            None => elem.attrs.push(Attribute::new(name, value)),
        }
        self.generation.bump();
        Ok(())
    }

    /// Set a namespaced attribute (`qualified_name` may carry a prefix)
    pub fn set_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let (prefix, local_name) = match qualified_name.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, qualified_name),
        };
        if prefix.is_some() && namespace.is_none() {
            return Err(DomError::Type(format!(
                "Prefixed attribute '{qualified_name}' requires a namespace"
            )));
        }
        let elem = self.element_mut(id)?;
        match elem
            .attrs
            .iter_mut()
            .find(|a| a.namespace.as_deref() == namespace && a.local_name == local_name)
        {
            Some(attr) => attr.value = value.to_string(),
            None => elem.attrs.push(Attribute {
                namespace: namespace.map(str::to_string),
                prefix: prefix.map(str::to_string),
                local_name: local_name.to_string(),
                value: value.to_string(),
            }),
        }
        self.generation.bump();
        Ok(())
    }

    /// Remove an attribute by qualified name; returns whether it existed
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        let elem = self.element_mut(id)?;
        let before = elem.attrs.len();
        if let Some(pos) = elem.attrs.iter().position(|a| a.qualified_name() == name) {
            elem.attrs.remove(pos);
        }
        let removed = elem.attrs.len() != before;
        if removed {
            self.generation.bump();
        }
        Ok(removed)
    }

    /// Remove an attribute by namespace and local name
    pub fn remove_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<bool, DomError> {
        let elem = self.element_mut(id)?;
        let before = elem.attrs.len();
        elem.attrs
            .retain(|a| !(a.namespace.as_deref() == namespace && a.local_name == local_name));
        let removed = elem.attrs.len() != before;
        if removed {
            self.generation.bump();
        }
        Ok(removed)
    }

    // ----- text -----

    /// `textContent`: `None` for the document and doctypes
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        let node = self.get(id)?;
        match &node.data {
            NodeData::Document | NodeData::Doctype { .. } => None,
            NodeData::Element(_) => {
                let mut out = String::new();
                for (_, desc) in self.descendants(id) {
                    if let Some(text) = desc.as_text() {
                        out.push_str(text);
                    }
                }
                Some(out)
            }
            _ => node.character_data().map(str::to_string),
        }
    }

    /// Set `textContent`: replaces element children with one text node
    pub(crate) fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let node = self
            .get(id)
            .ok_or_else(|| DomError::NotFound("Unknown node".into()))?;
        match node.data {
            NodeData::Document | NodeData::Doctype { .. } => Ok(()),
            NodeData::Element(_) => {
                self.remove_all_children(id);
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.append_child(id, text_node)?;
                }
                Ok(())
            }
            _ => self.set_character_data(id, text),
        }
    }

    /// Replace the data of a text, comment or processing-instruction node
    pub fn set_character_data(&mut self, id: NodeId, data: &str) -> Result<(), DomError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| DomError::NotFound("Unknown node".into()))?;
        match &mut node.data {
            NodeData::Text(s) | NodeData::Comment(s) => *s = data.to_string(),
            NodeData::ProcessingInstruction { data: d, .. } => *d = data.to_string(),
            _ => return Err(DomError::Type("The node has no character data".into())),
        }
        self.generation.bump();
        Ok(())
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling();
        Some((id, node))
    }
}

/// Lazy preorder iterator over a subtree, excluding its root
///
/// Restartable: clone it before advancing to walk the subtree again.
#[derive(Clone)]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id)?;

        self.next = node.first_child().or_else(|| {
            let mut cursor = id;
            loop {
                if cursor == self.root {
                    return None;
                }
                let current = self.tree.get(cursor)?;
                if let Some(sibling) = current.next_sibling() {
                    return Some(sibling);
                }
                cursor = current.parent()?;
            }
        });

        Some((id, node))
    }
}
