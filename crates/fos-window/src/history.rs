//! Session history
//!
//! Ordered entries with a current index; `push` drops forward entries.

use fos_dom::DocumentId;
use serde_json::Value;
use url::Url;

/// History entry
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub document: DocumentId,
    pub url: Url,
    pub title: String,
    pub state: Option<Value>,
}

/// Session history of one browsing context
#[derive(Debug)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    current: usize,
}

impl SessionHistory {
    pub fn new(initial: HistoryEntry) -> Self {
        Self {
            entries: vec![initial],
            current: 0,
        }
    }

    /// Push a new entry after the current one
    pub fn push(&mut self, entry: HistoryEntry) {
        // Remove forward history
        self.entries.truncate(self.current + 1);

        self.entries.push(entry);
        self.current = self.entries.len() - 1;
    }

    /// Replace the current entry
    pub fn replace(&mut self, entry: HistoryEntry) {
        if let Some(slot) = self.entries.get_mut(self.current) {
            *slot = entry;
        }
    }

    /// Move by `delta`; out-of-range moves change nothing
    pub fn go(&mut self, delta: i64) -> Option<&HistoryEntry> {
        let target = i64::try_from(self.current).ok()?.checked_add(delta)?;
        let target = usize::try_from(target).ok()?;
        if target >= self.entries.len() {
            return None;
        }
        self.current = target;
        self.entries.get(target)
    }

    pub fn back(&mut self) -> Option<&HistoryEntry> {
        self.go(-1)
    }

    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        self.go(1)
    }

    /// Get current entry
    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.current]
    }

    pub fn index(&self) -> usize {
        self.current
    }

    /// Get history length
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::{Document, DocumentOptions};
    use serde_json::json;

    fn entry(doc: DocumentId, path: &str) -> HistoryEntry {
        HistoryEntry {
            document: doc,
            url: Url::parse("https://example.com/").unwrap().join(path).unwrap(),
            title: String::new(),
            state: Some(json!({ "path": path })),
        }
    }

    fn doc_id() -> DocumentId {
        Document::new(DocumentOptions::default()).unwrap().id()
    }

    #[test]
    fn test_push_truncates_forward() {
        let doc = doc_id();
        let mut history = SessionHistory::new(entry(doc, "/"));
        history.push(entry(doc, "/a"));
        history.push(entry(doc, "/b"));
        assert_eq!(history.back().unwrap().url.path(), "/a");

        history.push(entry(doc, "/c"));
        assert_eq!(history.len(), 3);
        assert!(history.forward().is_none());
        assert_eq!(history.current().url.path(), "/c");
    }

    #[test]
    fn test_go_out_of_range() {
        let doc = doc_id();
        let mut history = SessionHistory::new(entry(doc, "/"));
        history.push(entry(doc, "/a"));

        assert!(history.go(-2).is_none());
        assert!(history.go(1).is_none());
        assert!(history.go(i64::MIN).is_none());
        assert_eq!(history.index(), 1);
        assert_eq!(history.go(-1).unwrap().state, Some(json!({ "path": "/" })));
    }

    #[test]
    fn test_replace_keeps_length() {
        let doc = doc_id();
        let mut history = SessionHistory::new(entry(doc, "/"));
        history.replace(entry(doc, "/x"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().url.path(), "/x");
    }
}
