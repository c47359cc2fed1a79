//! Attribute reflection
//!
//! IDL properties map onto content attributes through one table keyed by
//! (interface, property). Each rule names the attribute and a coercion kind;
//! reads never fail (absent or malformed values yield the table default),
//! writes fail only on a kind mismatch or a read-only composite.
//!
//! Composite kinds (token lists, `preserveAspectRatio`) are read-only as
//! properties and mutated through [`TokenList`] and [`PreserveAspectRatio`].

use std::collections::HashMap;
use std::sync::OnceLock;

use url::Url;

use crate::{DomError, DomTree, ElementInterface, NodeId};

/// Upper bound of reflected unsigned longs
const UNSIGNED_MAX: u32 = 2_147_483_647;

/// How a content attribute is coerced to and from its IDL value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    String,
    /// Resolved against the document URL on read
    Url,
    /// Presence means `true`
    Boolean,
    /// Signed integer, clamped into `[min, max]` on read
    Long { default: i64, min: i64, max: i64 },
    /// Unsigned integer, default when outside `[min, max]`, clamped on write
    UnsignedLong { default: u32, min: u32, max: u32 },
    /// One of `keywords` (ASCII case-insensitive), otherwise `missing`
    Enumerated {
        keywords: &'static [&'static str],
        missing: &'static str,
    },
    SpaceSeparatedTokens,
    CommaSeparatedTokens,
    PreserveAspectRatio,
}

/// One reflected property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectionRule {
    /// Content attribute local name
    pub attribute: &'static str,
    /// Attribute namespace (`None` for the null namespace)
    pub namespace: Option<&'static str>,
    pub coercion: Coercion,
    /// Property cannot be assigned directly
    pub read_only: bool,
}

/// IDL-side value of a reflected property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectedValue {
    String(String),
    Boolean(bool),
    Long(i64),
    UnsignedLong(u32),
    Tokens(Vec<String>),
    AspectRatio(AspectRatio),
}

impl ReflectedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value of either integer kind
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            Self::UnsignedLong(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&[String]> {
        match self {
            Self::Tokens(t) => Some(t),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Long(_) => "long",
            Self::UnsignedLong(_) => "unsigned long",
            Self::Tokens(_) => "token list",
            Self::AspectRatio(_) => "preserveAspectRatio",
        }
    }
}

impl From<&str> for ReflectedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ReflectedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ReflectedValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for ReflectedValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<u32> for ReflectedValue {
    fn from(value: u32) -> Self {
        Self::UnsignedLong(value)
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits.
/// Trailing garbage is ignored; no digits means `None`.
fn parse_integer(input: &str) -> Option<i64> {
    let s = input.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate on overflow, the caller clamps anyway
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_non_negative(input: &str) -> Option<u32> {
    let value = parse_integer(input)?;
    if value < 0 {
        return None;
    }
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

impl ReflectionRule {
    const fn new(attribute: &'static str, coercion: Coercion) -> Self {
        Self {
            attribute,
            namespace: None,
            coercion,
            read_only: false,
        }
    }

    const fn read_only(attribute: &'static str, coercion: Coercion) -> Self {
        Self {
            attribute,
            namespace: None,
            coercion,
            read_only: true,
        }
    }

    fn raw<'a>(&self, tree: &'a DomTree, element: NodeId) -> Option<&'a str> {
        tree.get_attribute_ns(element, self.namespace, self.attribute)
    }

    /// Read the IDL value; `base` is the document URL
    pub fn read(&self, tree: &DomTree, element: NodeId, base: Option<&Url>) -> ReflectedValue {
        let raw = self.raw(tree, element);
        match self.coercion {
            Coercion::String => ReflectedValue::String(raw.unwrap_or_default().to_string()),
            Coercion::Url => {
                let Some(raw) = raw else {
                    return ReflectedValue::String(String::new());
                };
                let resolved = base
                    .and_then(|base| base.join(raw).ok())
                    .map(String::from)
                    .unwrap_or_else(|| raw.to_string());
                ReflectedValue::String(resolved)
            }
            Coercion::Boolean => ReflectedValue::Boolean(raw.is_some()),
            Coercion::Long { default, min, max } => {
                let value = raw.and_then(parse_integer).unwrap_or(default);
                ReflectedValue::Long(value.clamp(min, max))
            }
            Coercion::UnsignedLong { default, min, max } => {
                let value = raw
                    .and_then(parse_non_negative)
                    .filter(|v| (min..=max).contains(v))
                    .unwrap_or(default);
                ReflectedValue::UnsignedLong(value)
            }
            Coercion::Enumerated { keywords, missing } => {
                let value = raw
                    .map(str::to_ascii_lowercase)
                    .and_then(|v| keywords.iter().find(|k| **k == v).copied())
                    .unwrap_or(missing);
                ReflectedValue::String(value.to_string())
            }
            Coercion::SpaceSeparatedTokens | Coercion::CommaSeparatedTokens => {
                let separator = TokenSeparator::for_coercion(self.coercion);
                ReflectedValue::Tokens(separator.split(raw.unwrap_or_default()))
            }
            Coercion::PreserveAspectRatio => {
                ReflectedValue::AspectRatio(AspectRatio::parse(raw.unwrap_or_default()))
            }
        }
    }

    /// Write the IDL value through to the content attribute
    pub fn write(
        &self,
        tree: &mut DomTree,
        element: NodeId,
        value: ReflectedValue,
    ) -> Result<(), DomError> {
        if self.read_only {
            return Err(DomError::NoModificationAllowed(format!(
                "'{}' is read-only; modify it through its list or value object",
                self.attribute
            )));
        }

        let serialized = match (self.coercion, &value) {
            (Coercion::String | Coercion::Url | Coercion::Enumerated { .. }, ReflectedValue::String(s)) => {
                s.clone()
            }
            (Coercion::Boolean, ReflectedValue::Boolean(true)) => String::new(),
            (Coercion::Boolean, ReflectedValue::Boolean(false)) => {
                tree.remove_attribute_ns(element, self.namespace, self.attribute)?;
                return Ok(());
            }
            (Coercion::Long { .. }, ReflectedValue::Long(_) | ReflectedValue::UnsignedLong(_)) => {
                value.as_i64().unwrap_or_default().to_string()
            }
            (
                Coercion::UnsignedLong { min, max, .. },
                ReflectedValue::Long(_) | ReflectedValue::UnsignedLong(_),
            ) => {
                let n = value.as_i64().unwrap_or_default();
                n.clamp(i64::from(min), i64::from(max)).to_string()
            }
            _ => {
                return Err(DomError::Type(format!(
                    "Cannot assign a {} value to '{}'",
                    value.kind(),
                    self.attribute
                )));
            }
        };

        tree.set_attribute_ns(element, self.namespace, self.attribute, &serialized)
    }
}

/// Reflection rules for every (interface, property) pair
#[derive(Debug)]
pub struct ReflectionTable {
    rules: HashMap<ElementInterface, HashMap<&'static str, ReflectionRule>>,
}

impl ReflectionTable {
    /// The process-wide table
    pub fn shared() -> &'static ReflectionTable {
        static TABLE: OnceLock<ReflectionTable> = OnceLock::new();
        TABLE.get_or_init(build_table)
    }

    /// Rule for `property`, searching the interface chain
    pub fn lookup(&self, interface: ElementInterface, property: &str) -> Option<&ReflectionRule> {
        interface
            .chain()
            .find_map(|i| self.rules.get(&i)?.get(property))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn build_table() -> ReflectionTable {
    use Coercion::*;
    use ElementInterface::*;

    const SCOPE: &[&str] = &["row", "col", "rowgroup", "colgroup"];
    const DIR: &[&str] = &["ltr", "rtl", "auto"];
    const METHOD: &[&str] = &["get", "post", "dialog"];
    const BUTTON_TYPE: &[&str] = &["submit", "reset", "button"];
    const TRACK_KIND: &[&str] = &["subtitles", "captions", "descriptions", "chapters", "metadata"];

    let unsigned = |default| UnsignedLong {
        default,
        min: 0,
        max: UNSIGNED_MAX,
    };
    let positive = |default| UnsignedLong {
        default,
        min: 1,
        max: UNSIGNED_MAX,
    };
    let rule = ReflectionRule::new;

    let mut rules: HashMap<ElementInterface, HashMap<&'static str, ReflectionRule>> = HashMap::new();
    let mut add = |interface: ElementInterface, entries: &[(&'static str, ReflectionRule)]| {
        let per_interface = rules.entry(interface).or_default();
        for (property, rule) in entries {
            per_interface.insert(*property, *rule);
        }
    };

    add(
        HtmlElement,
        &[
            ("id", rule("id", String)),
            ("title", rule("title", String)),
            ("lang", rule("lang", String)),
            ("className", rule("class", String)),
            ("accessKey", rule("accesskey", String)),
            ("hidden", rule("hidden", Boolean)),
            ("dir", rule("dir", Enumerated { keywords: DIR, missing: "" })),
        ],
    );
    add(
        HtmlTableCell,
        &[
            ("colSpan", rule("colspan", Long { default: 1, min: 1, max: 1000 })),
            ("rowSpan", rule("rowspan", Long { default: 1, min: 0, max: 65534 })),
            ("scope", rule("scope", Enumerated { keywords: SCOPE, missing: "" })),
            ("abbr", rule("abbr", String)),
            ("headers", rule("headers", String)),
        ],
    );
    add(
        HtmlTableCol,
        &[("span", rule("span", UnsignedLong { default: 1, min: 1, max: 1000 }))],
    );
    add(
        HtmlAnchor,
        &[
            ("href", rule("href", Url)),
            ("target", rule("target", String)),
            ("rel", rule("rel", String)),
            ("download", rule("download", String)),
            ("hreflang", rule("hreflang", String)),
            ("type", rule("type", String)),
        ],
    );
    add(
        HtmlArea,
        &[
            ("href", rule("href", Url)),
            ("alt", rule("alt", String)),
            ("target", rule("target", String)),
        ],
    );
    add(
        HtmlLink,
        &[
            ("href", rule("href", Url)),
            ("rel", rule("rel", String)),
            ("media", rule("media", String)),
            ("hreflang", rule("hreflang", String)),
            ("type", rule("type", String)),
        ],
    );
    add(
        HtmlImage,
        &[
            ("src", rule("src", Url)),
            ("alt", rule("alt", String)),
            ("useMap", rule("usemap", String)),
            ("isMap", rule("ismap", Boolean)),
            ("width", rule("width", unsigned(0))),
            ("height", rule("height", unsigned(0))),
            ("hspace", rule("hspace", unsigned(0))),
            ("vspace", rule("vspace", unsigned(0))),
        ],
    );
    add(
        HtmlScript,
        &[
            ("src", rule("src", Url)),
            ("type", rule("type", String)),
            ("charset", rule("charset", String)),
            ("defer", rule("defer", Boolean)),
        ],
    );
    add(
        HtmlIFrame,
        &[
            ("src", rule("src", Url)),
            ("name", rule("name", String)),
            ("width", rule("width", String)),
            ("height", rule("height", String)),
        ],
    );
    add(
        HtmlFrame,
        &[("src", rule("src", Url)), ("name", rule("name", String))],
    );
    add(
        HtmlForm,
        &[
            ("action", rule("action", Url)),
            ("name", rule("name", String)),
            ("target", rule("target", String)),
            ("method", rule("method", Enumerated { keywords: METHOD, missing: "get" })),
            ("noValidate", rule("novalidate", Boolean)),
        ],
    );
    add(
        HtmlInput,
        &[
            ("name", rule("name", String)),
            ("alt", rule("alt", String)),
            ("placeholder", rule("placeholder", String)),
            ("defaultValue", rule("value", String)),
            ("src", rule("src", Url)),
            ("disabled", rule("disabled", Boolean)),
            ("required", rule("required", Boolean)),
            ("readOnly", rule("readonly", Boolean)),
            ("multiple", rule("multiple", Boolean)),
            ("autofocus", rule("autofocus", Boolean)),
            ("defaultChecked", rule("checked", Boolean)),
            ("size", rule("size", positive(20))),
        ],
    );
    add(
        HtmlButton,
        &[
            ("name", rule("name", String)),
            ("value", rule("value", String)),
            ("disabled", rule("disabled", Boolean)),
            ("autofocus", rule("autofocus", Boolean)),
            ("type", rule("type", Enumerated { keywords: BUTTON_TYPE, missing: "submit" })),
        ],
    );
    add(
        HtmlSelect,
        &[
            ("name", rule("name", String)),
            ("disabled", rule("disabled", Boolean)),
            ("required", rule("required", Boolean)),
            ("multiple", rule("multiple", Boolean)),
            ("autofocus", rule("autofocus", Boolean)),
            ("size", rule("size", unsigned(0))),
        ],
    );
    add(
        HtmlTextArea,
        &[
            ("name", rule("name", String)),
            ("placeholder", rule("placeholder", String)),
            ("disabled", rule("disabled", Boolean)),
            ("required", rule("required", Boolean)),
            ("readOnly", rule("readonly", Boolean)),
            ("autofocus", rule("autofocus", Boolean)),
            ("cols", rule("cols", positive(20))),
            ("rows", rule("rows", positive(2))),
        ],
    );
    add(
        HtmlOption,
        &[
            ("disabled", rule("disabled", Boolean)),
            ("defaultSelected", rule("selected", Boolean)),
        ],
    );
    add(
        HtmlOptGroup,
        &[
            ("disabled", rule("disabled", Boolean)),
            ("label", rule("label", String)),
        ],
    );
    add(
        HtmlFieldSet,
        &[
            ("disabled", rule("disabled", Boolean)),
            ("name", rule("name", String)),
        ],
    );
    add(HtmlQuote, &[("cite", rule("cite", Url))]);
    add(
        HtmlMod,
        &[
            ("cite", rule("cite", Url)),
            ("dateTime", rule("datetime", String)),
        ],
    );
    add(
        HtmlEmbed,
        &[
            ("src", rule("src", Url)),
            ("type", rule("type", String)),
            ("width", rule("width", String)),
            ("height", rule("height", String)),
        ],
    );
    add(
        HtmlObject,
        &[
            ("data", rule("data", Url)),
            ("type", rule("type", String)),
            ("name", rule("name", String)),
            ("width", rule("width", String)),
            ("height", rule("height", String)),
        ],
    );
    let media: &[(&'static str, ReflectionRule)] = &[
        ("src", rule("src", Url)),
        ("autoplay", rule("autoplay", Boolean)),
        ("loop", rule("loop", Boolean)),
        ("controls", rule("controls", Boolean)),
        ("defaultMuted", rule("muted", Boolean)),
    ];
    add(HtmlAudio, media);
    add(HtmlVideo, media);
    add(
        HtmlVideo,
        &[
            ("poster", rule("poster", Url)),
            ("width", rule("width", unsigned(0))),
            ("height", rule("height", unsigned(0))),
        ],
    );
    add(
        HtmlSource,
        &[
            ("src", rule("src", Url)),
            ("type", rule("type", String)),
            ("media", rule("media", String)),
        ],
    );
    add(
        HtmlTrack,
        &[
            ("src", rule("src", Url)),
            ("label", rule("label", String)),
            ("srclang", rule("srclang", String)),
            ("default", rule("default", Boolean)),
            ("kind", rule("kind", Enumerated { keywords: TRACK_KIND, missing: "subtitles" })),
        ],
    );
    add(
        HtmlMeta,
        &[
            ("name", rule("name", String)),
            ("content", rule("content", String)),
            ("httpEquiv", rule("http-equiv", String)),
        ],
    );
    add(HtmlBase, &[("target", rule("target", String))]);
    add(HtmlLabel, &[("htmlFor", rule("for", String))]);
    add(
        HtmlLi,
        &[(
            "value",
            rule("value", Long { default: 0, min: i32::MIN.into(), max: i32::MAX.into() }),
        )],
    );
    add(
        HtmlOList,
        &[
            (
                "start",
                rule("start", Long { default: 1, min: i32::MIN.into(), max: i32::MAX.into() }),
            ),
            ("reversed", rule("reversed", Boolean)),
            ("type", rule("type", String)),
        ],
    );
    add(
        HtmlCanvas,
        &[
            ("width", rule("width", unsigned(300))),
            ("height", rule("height", unsigned(150))),
        ],
    );
    add(HtmlDetails, &[("open", rule("open", Boolean))]);
    add(HtmlDialog, &[("open", rule("open", Boolean))]);
    add(
        HtmlMarquee,
        &[
            ("hspace", rule("hspace", unsigned(0))),
            ("vspace", rule("vspace", unsigned(0))),
        ],
    );
    add(
        SvgElement,
        &[
            (
                "requiredExtensions",
                ReflectionRule::read_only("requiredExtensions", SpaceSeparatedTokens),
            ),
            (
                "systemLanguage",
                ReflectionRule::read_only("systemLanguage", CommaSeparatedTokens),
            ),
        ],
    );
    add(
        SvgSvg,
        &[(
            "preserveAspectRatio",
            ReflectionRule::read_only("preserveAspectRatio", PreserveAspectRatio),
        )],
    );

    ReflectionTable { rules }
}

// ----- token lists -----

/// Token list flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSeparator {
    /// ASCII whitespace, joined with `" "`
    Space,
    /// Commas, joined with `", "`
    Comma,
}

impl TokenSeparator {
    fn for_coercion(coercion: Coercion) -> Self {
        match coercion {
            Coercion::CommaSeparatedTokens => Self::Comma,
            _ => Self::Space,
        }
    }

    /// Split an attribute value, dropping empty tokens
    pub fn split(self, value: &str) -> Vec<String> {
        match self {
            Self::Space => value.split_ascii_whitespace().map(str::to_string).collect(),
            Self::Comma => value
                .split(',')
                .map(|t| t.trim_matches(|c: char| c.is_ascii_whitespace()))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Reserialize tokens
    pub fn join(self, tokens: &[String]) -> String {
        match self {
            Self::Space => tokens.join(" "),
            Self::Comma => tokens.join(", "),
        }
    }
}

/// Mutable list view over a token-list attribute
///
/// The view holds no tokens of its own: every read reparses the attribute
/// and every write reserializes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenList {
    element: NodeId,
    attribute: &'static str,
    namespace: Option<&'static str>,
    separator: TokenSeparator,
}

impl TokenList {
    /// View for a token-list rule; `None` for other kinds
    pub fn for_rule(element: NodeId, rule: &ReflectionRule) -> Option<Self> {
        match rule.coercion {
            Coercion::SpaceSeparatedTokens | Coercion::CommaSeparatedTokens => Some(Self {
                element,
                attribute: rule.attribute,
                namespace: rule.namespace,
                separator: TokenSeparator::for_coercion(rule.coercion),
            }),
            _ => None,
        }
    }

    pub fn separator(&self) -> TokenSeparator {
        self.separator
    }

    /// Current tokens
    pub fn tokens(&self, tree: &DomTree) -> Vec<String> {
        let raw = tree
            .get_attribute_ns(self.element, self.namespace, self.attribute)
            .unwrap_or_default();
        self.separator.split(raw)
    }

    /// `numberOfItems`
    pub fn len(&self, tree: &DomTree) -> usize {
        self.tokens(tree).len()
    }

    pub fn is_empty(&self, tree: &DomTree) -> bool {
        self.tokens(tree).is_empty()
    }

    /// `getItem`
    pub fn item(&self, tree: &DomTree, index: usize) -> Result<String, DomError> {
        self.tokens(tree)
            .get(index)
            .cloned()
            .ok_or_else(|| index_error(index))
    }

    fn store(&self, tree: &mut DomTree, tokens: &[String]) -> Result<(), DomError> {
        tree.set_attribute_ns(
            self.element,
            self.namespace,
            self.attribute,
            &self.separator.join(tokens),
        )
    }

    /// `appendItem`; empty tokens are dropped
    pub fn append(&self, tree: &mut DomTree, token: &str) -> Result<(), DomError> {
        let mut tokens = self.tokens(tree);
        tokens.extend(self.separator.split(token));
        self.store(tree, &tokens)
    }

    /// `insertItemBefore`; an index past the end appends
    pub fn insert_before(&self, tree: &mut DomTree, token: &str, index: usize) -> Result<(), DomError> {
        let mut tokens = self.tokens(tree);
        let at = index.min(tokens.len());
        for (offset, new) in self.separator.split(token).into_iter().enumerate() {
            tokens.insert(at + offset, new);
        }
        self.store(tree, &tokens)
    }

    /// `replaceItem`
    pub fn replace(&self, tree: &mut DomTree, token: &str, index: usize) -> Result<(), DomError> {
        let mut tokens = self.tokens(tree);
        if index >= tokens.len() {
            return Err(index_error(index));
        }
        let replacement = self.separator.split(token);
        tokens.splice(index..=index, replacement);
        self.store(tree, &tokens)
    }

    /// `removeItem`; returns the removed token
    pub fn remove(&self, tree: &mut DomTree, index: usize) -> Result<String, DomError> {
        let mut tokens = self.tokens(tree);
        if index >= tokens.len() {
            return Err(index_error(index));
        }
        let removed = tokens.remove(index);
        self.store(tree, &tokens)?;
        Ok(removed)
    }

    /// `clear`
    pub fn clear(&self, tree: &mut DomTree) -> Result<(), DomError> {
        self.store(tree, &[])
    }

    /// `initialize`: replace the whole list with `token`
    pub fn initialize(&self, tree: &mut DomTree, token: &str) -> Result<(), DomError> {
        self.store(tree, &self.separator.split(token))
    }
}

fn index_error(index: usize) -> DomError {
    DomError::IndexSize(format!("Index {index} is out of range"))
}

// ----- preserveAspectRatio -----

/// Alignment of `preserveAspectRatio`, numbered as the SVG constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AspectRatioAlign {
    Unknown = 0,
    None = 1,
    XMinYMin = 2,
    XMidYMin = 3,
    XMaxYMin = 4,
    XMinYMid = 5,
    XMidYMid = 6,
    XMaxYMid = 7,
    XMinYMax = 8,
    XMidYMax = 9,
    XMaxYMax = 10,
}

const ALIGNMENTS: [(AspectRatioAlign, &str); 10] = [
    (AspectRatioAlign::None, "none"),
    (AspectRatioAlign::XMinYMin, "xMinYMin"),
    (AspectRatioAlign::XMidYMin, "xMidYMin"),
    (AspectRatioAlign::XMaxYMin, "xMaxYMin"),
    (AspectRatioAlign::XMinYMid, "xMinYMid"),
    (AspectRatioAlign::XMidYMid, "xMidYMid"),
    (AspectRatioAlign::XMaxYMid, "xMaxYMid"),
    (AspectRatioAlign::XMinYMax, "xMinYMax"),
    (AspectRatioAlign::XMidYMax, "xMidYMax"),
    (AspectRatioAlign::XMaxYMax, "xMaxYMax"),
];

impl AspectRatioAlign {
    /// Keyword form; `None` for `Unknown`
    pub fn keyword(self) -> Option<&'static str> {
        ALIGNMENTS.iter().find(|(a, _)| *a == self).map(|(_, k)| *k)
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        ALIGNMENTS.iter().find(|(_, k)| *k == keyword).map(|(a, _)| *a)
    }

    /// From the numeric SVG constant
    pub fn from_code(code: u16) -> Option<Self> {
        ALIGNMENTS.iter().find(|(a, _)| *a as u16 == code).map(|(a, _)| *a)
    }
}

/// `meetOrSlice` of `preserveAspectRatio`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MeetOrSlice {
    Unknown = 0,
    Meet = 1,
    Slice = 2,
}

impl MeetOrSlice {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            Self::Meet => Some("meet"),
            Self::Slice => Some("slice"),
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Meet),
            2 => Some(Self::Slice),
            _ => None,
        }
    }
}

/// Parsed `preserveAspectRatio` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub align: AspectRatioAlign,
    pub meet_or_slice: MeetOrSlice,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            align: AspectRatioAlign::XMidYMid,
            meet_or_slice: MeetOrSlice::Meet,
        }
    }
}

impl AspectRatio {
    /// Parse `<align> [meet|slice]`; anything malformed yields the default
    pub fn parse(value: &str) -> Self {
        let mut parts = value.splitn(2, ' ');
        let align = parts.next().and_then(AspectRatioAlign::from_keyword);
        let rest = parts.next().map(|r| r.trim_start_matches(' '));
        let meet_or_slice = match rest {
            None => Some(MeetOrSlice::Meet),
            Some("meet") => Some(MeetOrSlice::Meet),
            Some("slice") => Some(MeetOrSlice::Slice),
            Some(_) => None,
        };
        match (align, meet_or_slice) {
            (Some(align), Some(meet_or_slice)) => Self { align, meet_or_slice },
            _ => Self::default(),
        }
    }

    fn serialize(self) -> String {
        format!(
            "{} {}",
            self.align.keyword().unwrap_or("xMidYMid"),
            self.meet_or_slice.keyword().unwrap_or("meet")
        )
    }
}

/// `SVGPreserveAspectRatio` view (`baseVal` or read-only `animVal`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreserveAspectRatio {
    element: NodeId,
    read_only: bool,
}

impl PreserveAspectRatio {
    /// Writable `baseVal`
    pub fn base_val(element: NodeId) -> Self {
        Self {
            element,
            read_only: false,
        }
    }

    /// Read-only `animVal`
    pub fn anim_val(element: NodeId) -> Self {
        Self {
            element,
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current parsed value
    pub fn value(&self, tree: &DomTree) -> AspectRatio {
        AspectRatio::parse(
            tree.get_attribute_ns(self.element, None, "preserveAspectRatio")
                .unwrap_or_default(),
        )
    }

    pub fn align(&self, tree: &DomTree) -> AspectRatioAlign {
        self.value(tree).align
    }

    pub fn meet_or_slice(&self, tree: &DomTree) -> MeetOrSlice {
        self.value(tree).meet_or_slice
    }

    fn check_writable(&self) -> Result<(), DomError> {
        if self.read_only {
            return Err(DomError::NoModificationAllowed(
                "Attempting to modify a read-only SVGPreserveAspectRatio".into(),
            ));
        }
        Ok(())
    }

    /// Set the alignment, keeping `meetOrSlice`
    pub fn set_align(&self, tree: &mut DomTree, align: AspectRatioAlign) -> Result<(), DomError> {
        self.check_writable()?;
        if align == AspectRatioAlign::Unknown {
            return Err(DomError::Type("Invalid alignment".into()));
        }
        let updated = AspectRatio {
            align,
            ..self.value(tree)
        };
        tree.set_attribute_ns(self.element, None, "preserveAspectRatio", &updated.serialize())
    }

    /// Set the alignment from its numeric constant
    pub fn set_align_code(&self, tree: &mut DomTree, code: u16) -> Result<(), DomError> {
        self.check_writable()?;
        let align =
            AspectRatioAlign::from_code(code).ok_or_else(|| DomError::Type("Invalid alignment".into()))?;
        self.set_align(tree, align)
    }

    /// Set `meetOrSlice`, keeping the alignment
    pub fn set_meet_or_slice(&self, tree: &mut DomTree, value: MeetOrSlice) -> Result<(), DomError> {
        self.check_writable()?;
        if value == MeetOrSlice::Unknown {
            return Err(DomError::Type("Invalid meet-or-slice value".into()));
        }
        let updated = AspectRatio {
            meet_or_slice: value,
            ..self.value(tree)
        };
        tree.set_attribute_ns(self.element, None, "preserveAspectRatio", &updated.serialize())
    }

    /// Set `meetOrSlice` from its numeric constant
    pub fn set_meet_or_slice_code(&self, tree: &mut DomTree, code: u16) -> Result<(), DomError> {
        self.check_writable()?;
        let value = MeetOrSlice::from_code(code)
            .ok_or_else(|| DomError::Type("Invalid meet-or-slice value".into()))?;
        self.set_meet_or_slice(tree, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ns, ElementData};

    fn setup(interface: ElementInterface, name: &str, namespace: &str) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let id = tree.create_element(ElementData::new(Some(namespace), None, name, interface));
        (tree, id)
    }

    fn rule(interface: ElementInterface, property: &str) -> ReflectionRule {
        *ReflectionTable::shared().lookup(interface, property).unwrap()
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("  42px"), Some(42));
        assert_eq!(parse_integer("-5"), Some(-5));
        assert_eq!(parse_integer("+7"), Some(7));
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_col_span_clamping() {
        let (mut tree, td) = setup(ElementInterface::HtmlTableCell, "td", ns::HTML);
        let col_span = rule(ElementInterface::HtmlTableCell, "colSpan");

        assert_eq!(col_span.read(&tree, td, None), ReflectedValue::Long(1));
        tree.set_attribute(td, "colspan", "-5").unwrap();
        assert_eq!(col_span.read(&tree, td, None), ReflectedValue::Long(1));
        tree.set_attribute(td, "colspan", "99999").unwrap();
        assert_eq!(col_span.read(&tree, td, None), ReflectedValue::Long(1000));
        tree.set_attribute(td, "colspan", "NaN").unwrap();
        assert_eq!(col_span.read(&tree, td, None), ReflectedValue::Long(1));
    }

    #[test]
    fn test_row_span_allows_zero() {
        let (mut tree, td) = setup(ElementInterface::HtmlTableCell, "td", ns::HTML);
        let row_span = rule(ElementInterface::HtmlTableCell, "rowSpan");
        tree.set_attribute(td, "rowspan", "-3").unwrap();
        assert_eq!(row_span.read(&tree, td, None), ReflectedValue::Long(0));
        row_span.write(&mut tree, td, 70000i64.into()).unwrap();
        assert_eq!(tree.get_attribute(td, "rowspan"), Some("70000"));
        assert_eq!(row_span.read(&tree, td, None), ReflectedValue::Long(65534));
    }

    #[test]
    fn test_boolean_round_trip() {
        let (mut tree, input) = setup(ElementInterface::HtmlInput, "input", ns::HTML);
        let disabled = rule(ElementInterface::HtmlInput, "disabled");

        disabled.write(&mut tree, input, true.into()).unwrap();
        assert_eq!(tree.get_attribute(input, "disabled"), Some(""));
        disabled.write(&mut tree, input, false.into()).unwrap();
        assert_eq!(tree.get_attribute(input, "disabled"), None);
        assert_eq!(disabled.read(&tree, input, None), ReflectedValue::Boolean(false));
    }

    #[test]
    fn test_unsigned_defaults() {
        let (mut tree, input) = setup(ElementInterface::HtmlInput, "input", ns::HTML);
        let size = rule(ElementInterface::HtmlInput, "size");
        assert_eq!(size.read(&tree, input, None), ReflectedValue::UnsignedLong(20));
        tree.set_attribute(input, "size", "0").unwrap();
        assert_eq!(size.read(&tree, input, None), ReflectedValue::UnsignedLong(20));
        tree.set_attribute(input, "size", "-1").unwrap();
        assert_eq!(size.read(&tree, input, None), ReflectedValue::UnsignedLong(20));
        size.write(&mut tree, input, (-4i64).into()).unwrap();
        assert_eq!(tree.get_attribute(input, "size"), Some("1"));
    }

    #[test]
    fn test_url_resolution() {
        let (mut tree, a) = setup(ElementInterface::HtmlAnchor, "a", ns::HTML);
        let href = rule(ElementInterface::HtmlAnchor, "href");
        let base = Url::parse("http://example.com/dir/page.html").unwrap();

        assert_eq!(href.read(&tree, a, Some(&base)), ReflectedValue::String(String::new()));
        tree.set_attribute(a, "href", "other.html").unwrap();
        assert_eq!(
            href.read(&tree, a, Some(&base)),
            ReflectedValue::String("http://example.com/dir/other.html".into())
        );
        // no usable base: raw value
        assert_eq!(href.read(&tree, a, None), ReflectedValue::String("other.html".into()));
    }

    #[test]
    fn test_enumerated_and_inheritance() {
        let (mut tree, th) = setup(ElementInterface::HtmlTableCell, "th", ns::HTML);
        let scope = rule(ElementInterface::HtmlTableCell, "scope");
        tree.set_attribute(th, "scope", "ROW").unwrap();
        assert_eq!(scope.read(&tree, th, None), ReflectedValue::String("row".into()));
        tree.set_attribute(th, "scope", "diagonal").unwrap();
        assert_eq!(scope.read(&tree, th, None), ReflectedValue::String(String::new()));

        // inherited from HTMLElement
        let id = rule(ElementInterface::HtmlTableCell, "id");
        assert_eq!(id.attribute, "id");
    }

    #[test]
    fn test_type_mismatch_and_read_only() {
        let (mut tree, td) = setup(ElementInterface::HtmlTableCell, "td", ns::HTML);
        let col_span = rule(ElementInterface::HtmlTableCell, "colSpan");
        let err = col_span.write(&mut tree, td, "3".into()).unwrap_err();
        assert_eq!(err.name(), "TypeError");

        let (mut tree, svg) = setup(ElementInterface::SvgSvg, "svg", ns::SVG);
        let langs = rule(ElementInterface::SvgSvg, "systemLanguage");
        let err = langs.write(&mut tree, svg, ReflectedValue::Tokens(vec![])).unwrap_err();
        assert_eq!(err.name(), "NoModificationAllowedError");
    }

    #[test]
    fn test_token_lists() {
        let (mut tree, svg) = setup(ElementInterface::SvgSvg, "svg", ns::SVG);
        let table = ReflectionTable::shared();
        let langs = TokenList::for_rule(svg, table.lookup(ElementInterface::SvgSvg, "systemLanguage").unwrap()).unwrap();
        let exts = TokenList::for_rule(svg, table.lookup(ElementInterface::SvgSvg, "requiredExtensions").unwrap()).unwrap();

        langs.append(&mut tree, "en").unwrap();
        langs.append(&mut tree, "fr").unwrap();
        langs.append(&mut tree, "").unwrap();
        assert_eq!(tree.get_attribute(svg, "systemLanguage"), Some("en, fr"));

        tree.set_attribute(svg, "requiredExtensions", "  a   b ").unwrap();
        assert_eq!(exts.tokens(&tree), vec!["a", "b"]);
        assert_eq!(exts.remove(&mut tree, 0).unwrap(), "a");
        assert_eq!(tree.get_attribute(svg, "requiredExtensions"), Some("b"));
        assert_eq!(exts.item(&tree, 5).unwrap_err().name(), "IndexSizeError");
    }

    #[test]
    fn test_preserve_aspect_ratio() {
        let (mut tree, svg) = setup(ElementInterface::SvgSvg, "svg", ns::SVG);
        let base = PreserveAspectRatio::base_val(svg);
        let anim = PreserveAspectRatio::anim_val(svg);

        assert_eq!(base.value(&tree), AspectRatio::default());
        tree.set_attribute(svg, "preserveAspectRatio", "xMinYMax   slice").unwrap();
        assert_eq!(base.align(&tree), AspectRatioAlign::XMinYMax);
        assert_eq!(base.meet_or_slice(&tree), MeetOrSlice::Slice);

        tree.set_attribute(svg, "preserveAspectRatio", "bogus").unwrap();
        assert_eq!(base.value(&tree), AspectRatio::default());

        base.set_align(&mut tree, AspectRatioAlign::None).unwrap();
        assert_eq!(tree.get_attribute(svg, "preserveAspectRatio"), Some("none meet"));

        assert_eq!(base.set_align_code(&mut tree, 11).unwrap_err().name(), "TypeError");
        assert_eq!(base.set_meet_or_slice(&mut tree, MeetOrSlice::Unknown).unwrap_err().name(), "TypeError");
        assert_eq!(
            anim.set_align(&mut tree, AspectRatioAlign::XMaxYMax).unwrap_err().name(),
            "NoModificationAllowedError"
        );
    }
}
