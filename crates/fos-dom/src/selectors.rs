//! Selector matching
//!
//! `SelectorMatcher` is the seam the document compiles and evaluates
//! selectors through. `CssSelectorMatcher` is the default: a small
//! Selectors Level 4 subset (type, universal, id, class, attribute,
//! combinators, structural and logical pseudo-classes) with compiled lists
//! memoized per selector string.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::query_cache::DEFAULT_MAX_ENTRIES;
use crate::{DomTree, ElementData, NodeData, NodeId, SelectorError};

/// Compiles and evaluates selector text against a tree
pub trait SelectorMatcher {
    /// Elements under `scope` (exclusive) matching `selectors`, in document order
    fn select(
        &self,
        tree: &DomTree,
        scope: NodeId,
        selectors: &str,
    ) -> Result<Vec<NodeId>, SelectorError>;

    /// First element under `scope` matching `selectors`
    fn first(
        &self,
        tree: &DomTree,
        scope: NodeId,
        selectors: &str,
    ) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.select(tree, scope, selectors)?.into_iter().next())
    }

    /// Whether `element` matches `selectors`
    fn matches(
        &self,
        tree: &DomTree,
        element: NodeId,
        selectors: &str,
    ) -> Result<bool, SelectorError>;
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    /// Create "odd" expression (2n+1)
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// Create "even" expression (2n)
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// Create An+B expression
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse from string like "2n+1", "odd", "even", "3"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();

        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }

        if let Ok(n) = s.parse::<i32>() {
            return Some(Self::new(0, n));
        }

        let s: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let n_pos = s.find('n')?;
        let a = match &s[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            a => a.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() {
            0
        } else if rest.starts_with('+') || rest.starts_with('-') {
            rest.parse().ok()?
        } else {
            return None;
        };
        Some(Self::new(a, b))
    }

    /// Check if index n (1-based) matches this expression
    pub fn matches(&self, n: usize) -> bool {
        let Ok(n) = i64::try_from(n) else {
            return false;
        };
        let (a, b) = (i64::from(self.a), i64::from(self.b));
        if a == 0 {
            return n == b;
        }

        let diff = n - b;
        if a > 0 {
            diff >= 0 && diff % a == 0
        } else {
            diff <= 0 && diff % a == 0
        }
    }
}

/// Supported pseudo-classes
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    NthOfType(NthExpression),
    NthLastOfType(NthExpression),
    Not(SelectorList),
    Is(SelectorList),
    Where(SelectorList),
    Checked,
    Disabled,
    Enabled,
    Link,
}

/// A component of a compound selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :root, :nth-child(), etc.
    PseudoClass(PseudoClass),
    /// Pseudo-element; parsed but never matches an element
    PseudoElement(String),
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (matcher, value) = match (&self.matcher, value) {
            (_, None) => return false,
            (None, Some(_)) => return true,
            (Some(matcher), Some(value)) => (matcher, value),
        };

        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_ascii_lowercase()
            } else {
                s.to_string()
            }
        };
        let val = fold(value);

        match matcher {
            AttributeMatcher::Exact(expected) => val == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                !expected.is_empty()
                    && !expected.contains(|c: char| c.is_ascii_whitespace())
                    && val.split_ascii_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                val == expected || val.starts_with(&format!("{expected}-"))
            }
            // empty operands never match for the substring family
            AttributeMatcher::Prefix(expected) => {
                !expected.is_empty() && val.starts_with(&fold(expected))
            }
            AttributeMatcher::Suffix(expected) => {
                !expected.is_empty() && val.ends_with(&fold(expected))
            }
            AttributeMatcher::Substring(expected) => {
                !expected.is_empty() && val.contains(&fold(expected))
            }
        }
    }
}

/// Relationship between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Components that all apply to one element
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

/// Compound selectors joined by combinators
///
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

// ----- parsing -----

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn err(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::new(self.src, reason)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.err(format!("expected '{expected}'")))
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.bump();
                    let escaped = self.bump().ok_or_else(|| self.err("dangling escape"))?;
                    out.push(escaped);
                }
                Some(c) if is_ident_char(c) => {
                    self.bump();
                    out.push(c);
                }
                _ => break,
            }
        }
        let mut chars = out.chars();
        let valid = match chars.next() {
            None => false,
            Some(c) if c.is_ascii_digit() => false,
            Some('-') => !chars.next().is_some_and(|c| c.is_ascii_digit()) && out.len() > 1,
            Some(_) => true,
        };
        if !valid {
            return Err(self.err("expected identifier"));
        }
        Ok(out)
    }

    fn string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string")),
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.err("unterminated string"))?;
                    out.push(escaped);
                }
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn selector_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.complex()?);
            self.skip_ws();
            if !self.eat(',') {
                break;
            }
        }
        Ok(SelectorList(list))
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(',') | Some(')') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.err(format!("unexpected '{c}'"))),
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_ws();
            }
            compounds.push(self.compound()?);
            combinators.push(combinator);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut components = Vec::new();
        match self.peek() {
            Some('*') => {
                self.bump();
                components.push(SelectorComponent::Universal);
            }
            Some(c) if is_ident_start(c) => {
                components.push(SelectorComponent::Type(self.ident()?));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    components.push(SelectorComponent::Id(self.ident()?));
                }
                Some('.') => {
                    self.bump();
                    components.push(SelectorComponent::Class(self.ident()?));
                }
                Some('[') => {
                    self.bump();
                    components.push(SelectorComponent::Attribute(self.attribute()?));
                }
                Some(':') => {
                    self.bump();
                    if self.eat(':') {
                        let name = self.ident()?.to_ascii_lowercase();
                        components.push(SelectorComponent::PseudoElement(name));
                    } else {
                        components.push(self.pseudo_class()?);
                    }
                }
                _ => break,
            }
        }

        if components.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.err(format!("unexpected '{c}'")),
                None => self.err("expected selector"),
            });
        }
        Ok(CompoundSelector { components })
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => None,
            Some('=') => Some('='),
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(self.err("malformed attribute selector"));
                }
                Some(c)
            }
            _ => return Err(self.err("malformed attribute selector")),
        };

        let Some(op) = op else {
            self.bump();
            return Ok(AttributeSelector {
                name,
                matcher: None,
                case_insensitive: false,
            });
        };
        self.bump(); // '='
        self.skip_ws();

        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.string(q)?
            }
            _ => self.ident()?,
        };
        self.skip_ws();

        let mut case_insensitive = false;
        if let Some(c) = self.peek().filter(|c| c.is_ascii_alphabetic()) {
            match c {
                'i' | 'I' => case_insensitive = true,
                's' | 'S' => {}
                _ => return Err(self.err("unknown attribute selector flag")),
            }
            self.bump();
            self.skip_ws();
        }
        self.expect(']')?;

        let matcher = match op {
            '=' => AttributeMatcher::Exact(value),
            '~' => AttributeMatcher::Contains(value),
            '|' => AttributeMatcher::DashMatch(value),
            '^' => AttributeMatcher::Prefix(value),
            '$' => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector {
            name,
            matcher: Some(matcher),
            case_insensitive,
        })
    }

    fn pseudo_class(&mut self) -> Result<SelectorComponent, SelectorError> {
        let name = self.ident()?.to_ascii_lowercase();

        if self.eat('(') {
            let pseudo = match name.as_str() {
                "not" | "is" | "where" => {
                    let list = self.selector_list()?;
                    match name.as_str() {
                        "not" => PseudoClass::Not(list),
                        "is" => PseudoClass::Is(list),
                        _ => PseudoClass::Where(list),
                    }
                }
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c != ')') {
                        self.bump();
                    }
                    let expr = NthExpression::parse(&self.src[start..self.pos])
                        .ok_or_else(|| self.err(format!("invalid :{name}() argument")))?;
                    match name.as_str() {
                        "nth-child" => PseudoClass::NthChild(expr),
                        "nth-last-child" => PseudoClass::NthLastChild(expr),
                        "nth-of-type" => PseudoClass::NthOfType(expr),
                        _ => PseudoClass::NthLastOfType(expr),
                    }
                }
                _ => return Err(self.err(format!("unsupported pseudo-class :{name}()"))),
            };
            self.skip_ws();
            self.expect(')')?;
            return Ok(SelectorComponent::PseudoClass(pseudo));
        }

        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "checked" => PseudoClass::Checked,
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            "link" | "any-link" => PseudoClass::Link,
            // legacy single-colon pseudo-elements
            "before" | "after" | "first-line" | "first-letter" => {
                return Ok(SelectorComponent::PseudoElement(name));
            }
            _ => return Err(self.err(format!("unsupported pseudo-class :{name}"))),
        };
        Ok(SelectorComponent::PseudoClass(pseudo))
    }
}

impl SelectorList {
    /// Parse selector text
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(text);
        let list = parser.selector_list()?;
        if parser.pos != text.len() {
            return Err(parser.err("unexpected trailing input"));
        }
        Ok(list)
    }

    /// Whether `element` matches any selector in the list
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        self.0.iter().any(|complex| complex.matches(tree, element))
    }
}

// ----- matching -----

const FORM_CONTROLS: [&str; 7] = [
    "button", "input", "select", "textarea", "optgroup", "option", "fieldset",
];

impl ComplexSelector {
    /// Whether `element` matches (right-to-left evaluation)
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.match_from(tree, n - 1, element),
        }
    }

    fn match_from(&self, tree: &DomTree, index: usize, element: NodeId) -> bool {
        if !self.compounds[index].matches(tree, element) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Descendant => {
                let mut cursor = parent_element(tree, element);
                while let Some(ancestor) = cursor {
                    if self.match_from(tree, index - 1, ancestor) {
                        return true;
                    }
                    cursor = parent_element(tree, ancestor);
                }
                false
            }
            Combinator::Child => parent_element(tree, element)
                .is_some_and(|parent| self.match_from(tree, index - 1, parent)),
            Combinator::NextSibling => previous_element(tree, element)
                .is_some_and(|prev| self.match_from(tree, index - 1, prev)),
            Combinator::SubsequentSibling => {
                let mut cursor = previous_element(tree, element);
                while let Some(prev) = cursor {
                    if self.match_from(tree, index - 1, prev) {
                        return true;
                    }
                    cursor = previous_element(tree, prev);
                }
                false
            }
        }
    }
}

fn parent_element(tree: &DomTree, id: NodeId) -> Option<NodeId> {
    tree.parent(id).filter(|&p| tree.element(p).is_some())
}

fn previous_element(tree: &DomTree, id: NodeId) -> Option<NodeId> {
    let mut cursor = tree.previous_sibling(id);
    while let Some(prev) = cursor {
        if tree.element(prev).is_some() {
            return Some(prev);
        }
        cursor = tree.previous_sibling(prev);
    }
    None
}

/// 1-based position and count among element siblings, optionally same-type only
fn sibling_position(tree: &DomTree, id: NodeId, same_type: bool) -> (usize, usize) {
    let Some(parent) = tree.parent(id) else {
        return (1, 1);
    };
    let local_name = tree.element(id).map(|e| (e.namespace.clone(), e.local_name.clone()));
    let mut index = 0;
    let mut count = 0;
    for sibling in tree.child_elements(parent) {
        if same_type {
            let same = tree
                .element(sibling)
                .map(|e| (e.namespace.clone(), e.local_name.clone()))
                == local_name;
            if !same {
                continue;
            }
        }
        count += 1;
        if sibling == id {
            index = count;
        }
    }
    (index, count)
}

fn attribute_value<'a>(elem: &'a ElementData, name: &str) -> Option<&'a str> {
    let html = elem.is_html();
    elem.attrs
        .iter()
        .find(|a| {
            let qualified = a.qualified_name();
            if html {
                qualified.eq_ignore_ascii_case(name)
            } else {
                qualified == name
            }
        })
        .map(|a| a.value.as_str())
}

fn is_disableable(elem: &ElementData) -> bool {
    elem.is_html() && FORM_CONTROLS.contains(&elem.local_name.as_str())
}

impl CompoundSelector {
    fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        let Some(elem) = tree.element(element) else {
            return false;
        };
        self.components
            .iter()
            .all(|component| match_component(component, tree, element, elem))
    }
}

fn match_component(
    component: &SelectorComponent,
    tree: &DomTree,
    id: NodeId,
    elem: &ElementData,
) -> bool {
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => {
            if elem.is_html() {
                elem.local_name.eq_ignore_ascii_case(tag)
            } else {
                elem.local_name == *tag
            }
        }
        SelectorComponent::Id(wanted) => elem.id() == Some(wanted.as_str()),
        SelectorComponent::Class(class) => elem.classes().any(|c| c == class),
        SelectorComponent::Attribute(attr) => attr.matches(attribute_value(elem, &attr.name)),
        SelectorComponent::PseudoClass(pseudo) => match_pseudo_class(pseudo, tree, id, elem),
        SelectorComponent::PseudoElement(_) => false,
    }
}

fn match_pseudo_class(pseudo: &PseudoClass, tree: &DomTree, id: NodeId, elem: &ElementData) -> bool {
    match pseudo {
        PseudoClass::Root => tree.parent(id) == Some(NodeId::ROOT),
        PseudoClass::Empty => tree.children(id).all(|(_, child)| match &child.data {
            NodeData::Element(_) => false,
            NodeData::Text(t) => t.is_empty(),
            _ => true,
        }),
        PseudoClass::FirstChild => sibling_position(tree, id, false).0 == 1,
        PseudoClass::LastChild => {
            let (index, count) = sibling_position(tree, id, false);
            index == count
        }
        PseudoClass::OnlyChild => sibling_position(tree, id, false).1 == 1,
        PseudoClass::FirstOfType => sibling_position(tree, id, true).0 == 1,
        PseudoClass::LastOfType => {
            let (index, count) = sibling_position(tree, id, true);
            index == count
        }
        PseudoClass::OnlyOfType => sibling_position(tree, id, true).1 == 1,
        PseudoClass::NthChild(expr) => expr.matches(sibling_position(tree, id, false).0),
        PseudoClass::NthLastChild(expr) => {
            let (index, count) = sibling_position(tree, id, false);
            expr.matches(count - index + 1)
        }
        PseudoClass::NthOfType(expr) => expr.matches(sibling_position(tree, id, true).0),
        PseudoClass::NthLastOfType(expr) => {
            let (index, count) = sibling_position(tree, id, true);
            expr.matches(count - index + 1)
        }
        PseudoClass::Not(list) => !list.matches(tree, id),
        PseudoClass::Is(list) | PseudoClass::Where(list) => list.matches(tree, id),
        PseudoClass::Checked => {
            elem.is_html()
                && match elem.local_name.as_str() {
                    "input" => {
                        let kind = elem.get_attr_ns(None, "type").unwrap_or_default();
                        (kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio"))
                            && elem.get_attr_ns(None, "checked").is_some()
                    }
                    "option" => elem.get_attr_ns(None, "selected").is_some(),
                    _ => false,
                }
        }
        PseudoClass::Disabled => is_disableable(elem) && elem.get_attr_ns(None, "disabled").is_some(),
        PseudoClass::Enabled => is_disableable(elem) && elem.get_attr_ns(None, "disabled").is_none(),
        PseudoClass::Link => {
            elem.is_html()
                && matches!(elem.local_name.as_str(), "a" | "area" | "link")
                && elem.get_attr_ns(None, "href").is_some()
        }
    }
}

#[derive(Debug, Default)]
struct CompiledMemo {
    lists: HashMap<String, Rc<SelectorList>>,
    order: VecDeque<String>,
}

/// Default matcher with a bounded per-string compilation memo
///
/// Once `max_entries` strings are memoized, the oldest compilation is dropped.
#[derive(Debug)]
pub struct CssSelectorMatcher {
    compiled: RefCell<CompiledMemo>,
    max_entries: usize,
}

impl Default for CssSelectorMatcher {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl CssSelectorMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            compiled: RefCell::new(CompiledMemo::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Compile `text`, reusing an earlier compilation of the same string
    pub fn compile(&self, text: &str) -> Result<Rc<SelectorList>, SelectorError> {
        if let Some(list) = self.compiled.borrow().lists.get(text) {
            return Ok(Rc::clone(list));
        }
        let list = Rc::new(SelectorList::parse(text)?);
        let mut memo = self.compiled.borrow_mut();
        while memo.lists.len() >= self.max_entries {
            let Some(oldest) = memo.order.pop_front() else {
                break;
            };
            memo.lists.remove(&oldest);
        }
        memo.lists.insert(text.to_string(), Rc::clone(&list));
        memo.order.push_back(text.to_string());
        Ok(list)
    }

    /// Number of memoized selector strings
    pub fn compiled_len(&self) -> usize {
        self.compiled.borrow().lists.len()
    }
}

impl SelectorMatcher for CssSelectorMatcher {
    fn select(
        &self,
        tree: &DomTree,
        scope: NodeId,
        selectors: &str,
    ) -> Result<Vec<NodeId>, SelectorError> {
        let list = self.compile(selectors)?;
        Ok(tree
            .descendants(scope)
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
            .filter(|&id| list.matches(tree, id))
            .collect())
    }

    fn first(
        &self,
        tree: &DomTree,
        scope: NodeId,
        selectors: &str,
    ) -> Result<Option<NodeId>, SelectorError> {
        let list = self.compile(selectors)?;
        Ok(tree
            .descendants(scope)
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
            .find(|&id| list.matches(tree, id)))
    }

    fn matches(
        &self,
        tree: &DomTree,
        element: NodeId,
        selectors: &str,
    ) -> Result<bool, SelectorError> {
        let list = self.compile(selectors)?;
        Ok(list.matches(tree, element))
    }
}
