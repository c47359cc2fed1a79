//! Live collections
//!
//! A collection remembers (root, traversal, predicate) and the generation of
//! its last materialization. Reads compare the tree generation: unchanged
//! returns the cached sequence, changed recomputes it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::{ns, Cached, DomTree, NodeId};

/// Handle to a collection owned by a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(pub(crate) usize);

/// Which nodes under the root are candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// Direct children only
    Children,
    /// All descendants in document order
    Descendants,
}

/// Membership test applied to each candidate
#[derive(Clone)]
pub enum Predicate {
    /// Any element
    Elements,
    /// Qualified name, `*` for all; HTML elements compare case-insensitively
    LocalName(String),
    /// Elements carrying every listed class
    ClassNames(Vec<String>),
    /// Named-object lookup (`window[name]`)
    NamedObject(String),
    /// Caller-supplied test
    Custom(Rc<dyn Fn(&DomTree, NodeId) -> bool>),
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elements => f.write_str("Elements"),
            Self::LocalName(name) => f.debug_tuple("LocalName").field(name).finish(),
            Self::ClassNames(names) => f.debug_tuple("ClassNames").field(names).finish(),
            Self::NamedObject(name) => f.debug_tuple("NamedObject").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Elements that expose themselves by `name` as window named properties
const NAMED_BY_NAME: [&str; 6] = ["a", "embed", "form", "frameset", "img", "object"];

impl Predicate {
    /// Whether `id` belongs to the collection
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        let Some(elem) = tree.element(id) else {
            return false;
        };
        match self {
            Self::Elements => true,
            Self::LocalName(name) => {
                if name == "*" {
                    return true;
                }
                let qualified = elem.qualified_name();
                if elem.is_html() {
                    qualified.eq_ignore_ascii_case(name)
                } else {
                    qualified == *name
                }
            }
            Self::ClassNames(names) => {
                !names.is_empty() && names.iter().all(|n| elem.classes().any(|c| c == n))
            }
            Self::NamedObject(name) => {
                if !elem.is_html() || name.is_empty() {
                    return false;
                }
                let by_name = NAMED_BY_NAME.contains(&elem.local_name.as_str())
                    && elem.get_attr_ns(None, "name") == Some(name.as_str());
                by_name || elem.id() == Some(name.as_str())
            }
            Self::Custom(test) => test(tree, id),
        }
    }

    /// Class-name predicate from a space-separated list
    pub fn class_names(names: &str) -> Self {
        Self::ClassNames(names.split_ascii_whitespace().map(str::to_string).collect())
    }
}

/// A live view over part of a tree
pub struct LiveCollection {
    root: NodeId,
    traversal: Traversal,
    predicate: Predicate,
    cache: RefCell<Option<Cached<Rc<[NodeId]>>>>,
}

impl fmt::Debug for LiveCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCollection")
            .field("root", &self.root)
            .field("traversal", &self.traversal)
            .field("predicate", &self.predicate)
            .finish()
    }
}

impl LiveCollection {
    pub fn new(root: NodeId, traversal: Traversal, predicate: Predicate) -> Self {
        Self {
            root,
            traversal,
            predicate,
            cache: RefCell::new(None),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Current members, recomputed only if the tree changed since last read
    pub fn items(&self, tree: &DomTree) -> Rc<[NodeId]> {
        let generation = tree.generation();
        if let Some(items) = self
            .cache
            .borrow()
            .as_ref()
            .and_then(|cached| cached.get_if_valid(generation))
        {
            return Rc::clone(items);
        }

        let items: Rc<[NodeId]> = match self.traversal {
            Traversal::Children => tree
                .children(self.root)
                .map(|(id, _)| id)
                .filter(|&id| self.predicate.matches(tree, id))
                .collect(),
            Traversal::Descendants => tree
                .descendants(self.root)
                .map(|(id, _)| id)
                .filter(|&id| self.predicate.matches(tree, id))
                .collect(),
        };
        tracing::trace!(
            root = self.root.index(),
            len = items.len(),
            generation = generation.value(),
            "Recomputed live collection"
        );

        let mut cache = self.cache.borrow_mut();
        match cache.as_mut() {
            Some(cached) => cached.update(Rc::clone(&items), generation),
            None => *cache = Some(Cached::new(Rc::clone(&items), generation)),
        }
        items
    }

    /// Number of members
    pub fn len(&self, tree: &DomTree) -> usize {
        self.items(tree).len()
    }

    pub fn is_empty(&self, tree: &DomTree) -> bool {
        self.items(tree).is_empty()
    }

    /// Member at `index`
    pub fn item(&self, tree: &DomTree, index: usize) -> Option<NodeId> {
        self.items(tree).get(index).copied()
    }

    /// First member whose `id` or (for HTML elements) `name` is `key`
    pub fn named_item(&self, tree: &DomTree, key: &str) -> Option<NodeId> {
        if key.is_empty() {
            return None;
        }
        self.items(tree).iter().copied().find(|&id| {
            tree.element(id).is_some_and(|elem| {
                elem.id() == Some(key)
                    || (elem.namespace.as_deref() == Some(ns::HTML)
                        && elem.get_attr_ns(None, "name") == Some(key))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementData, ElementInterface};

    fn html(tree: &mut DomTree, name: &str) -> NodeId {
        tree.create_element(ElementData::new(
            Some(ns::HTML),
            None,
            name,
            ElementInterface::HtmlElement,
        ))
    }

    #[test]
    fn test_collection_tracks_mutations() {
        let mut tree = DomTree::new();
        let root = html(&mut tree, "div");
        let a = html(&mut tree, "p");
        tree.append_child(root, a).unwrap();

        let coll = LiveCollection::new(root, Traversal::Descendants, Predicate::LocalName("P".into()));
        assert_eq!(&*coll.items(&tree), &[a]);

        let b = html(&mut tree, "p");
        tree.insert_before(root, b, Some(a)).unwrap();
        assert_eq!(&*coll.items(&tree), &[b, a]);

        tree.remove_child(root, a).unwrap();
        assert_eq!(&*coll.items(&tree), &[b]);
    }

    #[test]
    fn test_cached_sequence_reused() {
        let mut tree = DomTree::new();
        let root = html(&mut tree, "div");
        let a = html(&mut tree, "span");
        tree.append_child(root, a).unwrap();

        let coll = LiveCollection::new(root, Traversal::Children, Predicate::Elements);
        let first = coll.items(&tree);
        let second = coll.items(&tree);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_class_names_predicate() {
        let mut tree = DomTree::new();
        let root = html(&mut tree, "div");
        let a = html(&mut tree, "span");
        let b = html(&mut tree, "span");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.set_attribute(a, "class", "x y").unwrap();
        tree.set_attribute(b, "class", "x").unwrap();

        let both = LiveCollection::new(root, Traversal::Descendants, Predicate::class_names("y  x"));
        assert_eq!(&*both.items(&tree), &[a]);

        let none = LiveCollection::new(root, Traversal::Descendants, Predicate::class_names("  "));
        assert!(none.is_empty(&tree));
    }

    #[test]
    fn test_named_object_predicate() {
        let mut tree = DomTree::new();
        let root = html(&mut tree, "body");
        let form = html(&mut tree, "form");
        let div = html(&mut tree, "div");
        tree.append_child(root, form).unwrap();
        tree.append_child(root, div).unwrap();
        tree.set_attribute(form, "name", "login").unwrap();
        tree.set_attribute(div, "name", "login").unwrap();

        let named = Predicate::NamedObject("login".into());
        assert!(named.matches(&tree, form));
        // div is not exposed by name
        assert!(!named.matches(&tree, div));

        tree.set_attribute(div, "id", "login").unwrap();
        assert!(named.matches(&tree, div));
    }
}
