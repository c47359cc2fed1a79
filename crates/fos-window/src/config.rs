//! Window configuration

use std::rc::Rc;

use fos_dom::{
    CookieJar, DocumentFeatureOverrides, DocumentOptions, ParsingMode, ResourceLoader, SelectorMatcher,
};
use fos_js::ScriptingMode;

use crate::console::{DiagnosticSink, NoopSink};
use crate::scheduler::{Scheduler, VirtualClock};

/// Window construction options
#[derive(Clone)]
pub struct WindowOptions {
    /// Browsing context name (`window.name`); empty by default, not `"nodejs"`
    pub name: String,

    /// HTML or XML document
    pub parsing_mode: ParsingMode,

    pub content_type: String,

    pub encoding: String,

    /// Document URL
    pub url: String,

    pub referrer: String,

    pub cookie_jar: Option<Rc<dyn CookieJar>>,

    pub resource_loader: Option<Rc<dyn ResourceLoader>>,

    /// Working `NodeIterator` limit
    pub concurrent_node_iterators: usize,

    /// `navigator.userAgent`
    pub user_agent: String,

    pub scripting: ScriptingMode,

    /// Visible document, animation frames available
    pub pretend_to_be_visual: bool,

    /// Receives console output and diagnostics
    pub sink: Rc<dyn DiagnosticSink>,

    /// Runs every deferred task
    pub scheduler: Rc<dyn Scheduler>,

    pub features: DocumentFeatureOverrides,

    /// Defaults to the built-in CSS matcher
    pub selector_matcher: Option<Rc<dyn SelectorMatcher>>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            parsing_mode: ParsingMode::Html,
            content_type: "text/html".to_string(),
            encoding: "UTF-8".to_string(),
            url: "about:blank".to_string(),
            referrer: String::new(),
            cookie_jar: None,
            resource_loader: None,
            concurrent_node_iterators: 10,
            user_agent: format!("Mozilla/5.0 ({}) fOS-Engine/{}", std::env::consts::OS, crate::VERSION),
            scripting: ScriptingMode::Disabled,
            pretend_to_be_visual: false,
            sink: Rc::new(NoopSink),
            scheduler: Rc::new(VirtualClock::new()),
            features: DocumentFeatureOverrides::default(),
            selector_matcher: None,
        }
    }
}

impl std::fmt::Debug for WindowOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowOptions")
            .field("name", &self.name)
            .field("parsing_mode", &self.parsing_mode)
            .field("url", &self.url)
            .field("scripting", &self.scripting)
            .field("pretend_to_be_visual", &self.pretend_to_be_visual)
            .finish_non_exhaustive()
    }
}

impl WindowOptions {
    /// Options of the window's document
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            parsing_mode: self.parsing_mode,
            content_type: self.content_type.clone(),
            encoding: self.encoding.clone(),
            url: self.url.clone(),
            referrer: self.referrer.clone(),
            features: self.features.clone(),
            cookie_jar: self.cookie_jar.clone(),
            resource_loader: self.resource_loader.clone(),
            concurrent_node_iterators: self.concurrent_node_iterators,
            pretend_to_be_visual: self.pretend_to_be_visual,
            selector_matcher: self.selector_matcher.clone(),
            ..Default::default()
        }
    }

    /// Options for a nested browsing context: same host hooks, blank document
    pub(crate) fn nested(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            parsing_mode: ParsingMode::Html,
            content_type: "text/html".to_string(),
            url: "about:blank".to_string(),
            referrer: String::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WindowOptions::default();
        assert_eq!(options.url, "about:blank");
        assert_eq!(options.name, "");
        assert_eq!(options.scripting, ScriptingMode::Disabled);
        assert!(options.user_agent.contains("fOS-Engine/"));
        assert_eq!(options.concurrent_node_iterators, 10);
    }

    #[test]
    fn test_document_options_carry_over() {
        let options = WindowOptions {
            url: "https://example.com/page".into(),
            pretend_to_be_visual: true,
            ..Default::default()
        };
        let doc = options.document_options();
        assert_eq!(doc.url, "https://example.com/page");
        assert!(doc.pretend_to_be_visual);
    }

    #[test]
    fn test_nested_resets_document_fields() {
        let options = WindowOptions {
            url: "https://example.com/".into(),
            scripting: ScriptingMode::OutsideOnly,
            ..Default::default()
        };
        let nested = options.nested("child");
        assert_eq!(nested.url, "about:blank");
        assert_eq!(nested.name, "child");
        assert_eq!(nested.scripting, ScriptingMode::OutsideOnly);
        assert!(Rc::ptr_eq(&nested.scheduler, &options.scheduler));
    }
}
