//! Document features
//!
//! Two features gate resource loading:
//! - `FetchExternalResources`: tag names whose resources may be fetched
//!   (default `script`, `link`)
//! - `SkipExternalResources`: `true` skips every fetch, a string skips URLs
//!   containing it (default `false`, which is never stored)

use std::collections::HashMap;

/// Feature controlling which element kinds fetch resources
pub const FETCH_EXTERNAL_RESOURCES: &str = "FetchExternalResources";
/// Feature suppressing fetches entirely or by URL fragment
pub const SKIP_EXTERNAL_RESOURCES: &str = "SkipExternalResources";

const AVAILABLE_FEATURES: [&str; 2] = [FETCH_EXTERNAL_RESOURCES, SKIP_EXTERNAL_RESOURCES];

/// One feature value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Flag(bool),
    Name(String),
}

impl FeatureValue {
    fn is_truthy(&self) -> bool {
        match self {
            FeatureValue::Flag(b) => *b,
            FeatureValue::Name(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Flag(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Name(value.to_string())
    }
}

/// Override source: a single value or a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSource {
    One(FeatureValue),
    Many(Vec<FeatureValue>),
}

impl FeatureSource {
    /// List of tag names
    pub fn names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        FeatureSource::Many(names.into_iter().map(FeatureValue::from).collect())
    }

    fn is_truthy(&self) -> bool {
        match self {
            FeatureSource::One(value) => value.is_truthy(),
            // an array is truthy even when empty
            FeatureSource::Many(_) => true,
        }
    }
}

/// Caller-supplied feature overrides, keyed by feature name
///
/// Keys are matched exactly first, then in lowercase.
#[derive(Debug, Clone, Default)]
pub struct DocumentFeatureOverrides {
    pub values: HashMap<String, FeatureSource>,
}

impl DocumentFeatureOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, source: FeatureSource) -> Self {
        self.values.insert(name.to_string(), source);
        self
    }

    fn lookup(&self, name: &str) -> Option<&FeatureSource> {
        self.values
            .get(name)
            .or_else(|| self.values.get(&name.to_ascii_lowercase()))
    }
}

/// Feature values active on a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    features: HashMap<String, Vec<FeatureValue>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value to a feature
    pub fn add(&mut self, name: &str, value: FeatureValue) {
        self.features
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value);
    }

    /// Drop every value of a feature
    pub fn remove(&mut self, name: &str) {
        self.features.remove(&name.to_ascii_lowercase());
    }

    /// Values of a feature (empty if unset)
    pub fn values(&self, name: &str) -> &[FeatureValue] {
        self.features
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the feature has any value at all
    pub fn is_set(&self, name: &str) -> bool {
        self.features.contains_key(&name.to_ascii_lowercase())
    }

    /// Whether `name` lists `value` (ASCII case-insensitive)
    pub fn has(&self, name: &str, value: &str) -> bool {
        self.values(name).iter().any(|v| match v {
            FeatureValue::Name(s) => s.eq_ignore_ascii_case(value),
            FeatureValue::Flag(_) => false,
        })
    }

    /// Whether an element named `tag` may fetch `url`
    pub fn allows_fetch(&self, tag: &str, url: &str) -> bool {
        let skipped = self.values(SKIP_EXTERNAL_RESOURCES).iter().any(|v| match v {
            FeatureValue::Flag(b) => *b,
            FeatureValue::Name(fragment) => !fragment.is_empty() && url.contains(fragment.as_str()),
        });
        !skipped && self.has(FETCH_EXTERNAL_RESOURCES, tag)
    }

    /// Feature set with nothing fetched (used for parsed fragments)
    pub fn scripting_disabled() -> Self {
        let mut set = Self::new();
        let overrides = DocumentFeatureOverrides::new()
            .with(FETCH_EXTERNAL_RESOURCES, FeatureSource::Many(Vec::new()));
        apply_document_features(&mut set, &overrides);
        set
    }
}

fn default_source(name: &str) -> Option<FeatureSource> {
    match name {
        FETCH_EXTERNAL_RESOURCES => Some(FeatureSource::names(["script", "link"])),
        SKIP_EXTERNAL_RESOURCES => Some(FeatureSource::One(FeatureValue::Flag(false))),
        _ => None,
    }
}

/// Apply overrides on top of the defaults
///
/// For each known feature the source is the override (exact name, then
/// lowercase) or the default; a falsy default is skipped. The feature is
/// cleared and the source's values added.
pub fn apply_document_features(set: &mut FeatureSet, overrides: &DocumentFeatureOverrides) {
    for name in AVAILABLE_FEATURES {
        let source = match overrides.lookup(name) {
            Some(source) => source.clone(),
            None => match default_source(name) {
                Some(default) if default.is_truthy() => default,
                _ => continue,
            },
        };

        set.remove(name);
        match source {
            FeatureSource::One(value) => set.add(name, value),
            FeatureSource::Many(values) => {
                for value in values {
                    set.add(name, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut set = FeatureSet::new();
        apply_document_features(&mut set, &DocumentFeatureOverrides::default());

        assert!(set.has(FETCH_EXTERNAL_RESOURCES, "script"));
        assert!(set.has(FETCH_EXTERNAL_RESOURCES, "LINK"));
        assert!(!set.has(FETCH_EXTERNAL_RESOURCES, "frame"));
        // falsy default is never stored
        assert!(!set.is_set(SKIP_EXTERNAL_RESOURCES));
    }

    #[test]
    fn test_lowercase_override_and_single_value() {
        let overrides = DocumentFeatureOverrides::new()
            .with("fetchexternalresources", FeatureSource::One("frame".into()));
        let mut set = FeatureSet::new();
        apply_document_features(&mut set, &overrides);

        assert_eq!(set.values(FETCH_EXTERNAL_RESOURCES), &[FeatureValue::Name("frame".into())]);
        assert!(set.allows_fetch("frame", "http://x/"));
        assert!(!set.allows_fetch("script", "http://x/"));
    }

    #[test]
    fn test_skip_external_resources() {
        let overrides = DocumentFeatureOverrides::new()
            .with(SKIP_EXTERNAL_RESOURCES, FeatureSource::One("ads.example".into()));
        let mut set = FeatureSet::new();
        apply_document_features(&mut set, &overrides);

        assert!(set.allows_fetch("script", "http://cdn.example/app.js"));
        assert!(!set.allows_fetch("script", "http://ads.example/track.js"));
    }

    #[test]
    fn test_empty_list_disables_fetching() {
        let overrides = DocumentFeatureOverrides::new()
            .with(FETCH_EXTERNAL_RESOURCES, FeatureSource::Many(Vec::new()));
        let mut set = FeatureSet::new();
        apply_document_features(&mut set, &overrides);

        assert!(set.values(FETCH_EXTERNAL_RESOURCES).is_empty());
        assert!(!set.allows_fetch("script", "http://x/"));
        assert_eq!(set, FeatureSet::scripting_disabled());
    }
}
