//! Resource loading boundary
//!
//! Network access is never performed here. A `ResourceLoader` supplied by the
//! embedder starts requests; the `RequestManager` tracks them so that
//! `stop()`/`close()` can abort whatever is still in flight.

use std::cell::RefCell;
use std::collections::BTreeMap;

use url::Url;

/// An in-flight request that can be aborted
pub trait ResourceRequest {
    fn abort(&self);
}

/// Embedder hook that starts resource fetches
pub trait ResourceLoader {
    /// Start fetching `url` on behalf of an element named `tag`.
    /// `None` means the loader declined.
    fn fetch(&self, url: &Url, tag: &str) -> Option<Box<dyn ResourceRequest>>;
}

/// Cookie storage shared with the embedder
pub trait CookieJar {
    /// `document.cookie` getter for `url`
    fn cookie_string(&self, url: &Url) -> String;
    /// `document.cookie` setter
    fn set_cookie(&self, cookie: &str, url: &Url);
}

/// Handle of a tracked request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

/// Open requests of one document
#[derive(Default)]
pub struct RequestManager {
    open: BTreeMap<RequestId, Box<dyn ResourceRequest>>,
    next_id: u64,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("open", &self.open.len())
            .finish()
    }
}

impl RequestManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a started request
    pub fn add(&mut self, request: Box<dyn ResourceRequest>) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.open.insert(id, request);
        id
    }

    /// Forget a request that finished on its own
    pub fn complete(&mut self, id: RequestId) -> bool {
        self.open.remove(&id).is_some()
    }

    /// Abort every open request
    pub fn close(&mut self) {
        let open = std::mem::take(&mut self.open);
        if !open.is_empty() {
            tracing::debug!(count = open.len(), "Aborting open requests");
        }
        for request in open.values() {
            request.abort();
        }
    }

    /// Number of open requests
    pub fn size(&self) -> usize {
        self.open.len()
    }
}

/// Minimal in-memory cookie jar: `name=value` pairs, attributes ignored
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RefCell<Vec<(String, String, String)>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_string(&self, url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        self.cookies
            .borrow()
            .iter()
            .filter(|(h, _, _)| h == host)
            .map(|(_, name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, cookie: &str, url: &Url) {
        let pair = cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let host = url.host_str().unwrap_or_default().to_string();
        let (name, value) = (name.trim().to_string(), value.trim().to_string());

        let mut cookies = self.cookies.borrow_mut();
        match cookies.iter_mut().find(|(h, n, _)| *h == host && *n == name) {
            Some(entry) => entry.2 = value,
            None => cookies.push((host, name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingRequest(Rc<Cell<u32>>);

    impl ResourceRequest for CountingRequest {
        fn abort(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_close_aborts_open_requests() {
        let aborted = Rc::new(Cell::new(0));
        let mut manager = RequestManager::new();
        let a = manager.add(Box::new(CountingRequest(Rc::clone(&aborted))));
        manager.add(Box::new(CountingRequest(Rc::clone(&aborted))));
        assert_eq!(manager.size(), 2);

        assert!(manager.complete(a));
        assert!(!manager.complete(a));

        manager.close();
        assert_eq!(aborted.get(), 1);
        assert_eq!(manager.size(), 0);

        manager.close();
        assert_eq!(aborted.get(), 1);
    }

    #[test]
    fn test_memory_cookie_jar() {
        let jar = MemoryCookieJar::new();
        let url = Url::parse("http://example.com/").unwrap();
        jar.set_cookie("a=1; Path=/", &url);
        jar.set_cookie("b=2", &url);
        jar.set_cookie("a=3", &url);
        assert_eq!(jar.cookie_string(&url), "a=3; b=2");

        let other = Url::parse("http://other.test/").unwrap();
        assert_eq!(jar.cookie_string(&other), "");
    }
}
