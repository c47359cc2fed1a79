//! Window
//!
//! The top-level global of a browsing context. A window owns its document,
//! session history, timer tables and nested frames. Everything deferred
//! runs through the injected scheduler; nothing registered during a call is
//! invoked within that call.

use std::cell::{Cell, OnceCell, Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::sync::OnceLock;
use std::time::Duration;

use fos_dom::{
    invoke_listeners, ns, CollectionId, Document, DomError, Event, EventListeners, Listener, ListenerId,
    NodeId, ParsingMode, ReadyState,
};
use fos_html::{DomParser, HtmlParser, XmlOutcome, XmlParser};
use fos_js::ScriptContext;
use serde_json::Value;
use url::Url;

use crate::config::WindowOptions;
use crate::console::{NOT_IMPLEMENTED, RUNTIME_ERROR};
use crate::error::WindowError;
use crate::history::{HistoryEntry, SessionHistory};
use crate::navigator::Navigator;
use crate::scheduler::{HostHandle, Recurrence};
use crate::timers::{normalize_delay, FrameHandler, TimerHandler, TimerTables, FRAME_INTERVAL};

pub const INNER_WIDTH: u32 = 1024;
pub const INNER_HEIGHT: u32 = 768;
pub const OUTER_WIDTH: u32 = 1024;
pub const OUTER_HEIGHT: u32 = 1024;

/// GlobalEventHandlers attribute names
const GLOBAL_EVENT_HANDLERS: &[&str] = &[
    "onabort", "onauxclick", "onblur", "oncancel", "oncanplay", "oncanplaythrough", "onchange",
    "onclick", "onclose", "oncontextmenu", "oncuechange", "ondblclick", "ondrag", "ondragend",
    "ondragenter", "ondragleave", "ondragover", "ondragstart", "ondrop", "ondurationchange",
    "onemptied", "onended", "onerror", "onfocus", "oninput", "oninvalid", "onkeydown",
    "onkeypress", "onkeyup", "onload", "onloadeddata", "onloadedmetadata", "onloadstart",
    "onmousedown", "onmouseenter", "onmouseleave", "onmousemove", "onmouseout", "onmouseover",
    "onmouseup", "onpause", "onplay", "onplaying", "onprogress", "onratechange", "onreset",
    "onresize", "onscroll", "onseeked", "onseeking", "onselect", "onstalled", "onsubmit",
    "onsuspend", "ontimeupdate", "ontoggle", "onvolumechange", "onwaiting", "onwheel",
];

/// WindowEventHandlers attribute names
const WINDOW_EVENT_HANDLERS: &[&str] = &[
    "onafterprint", "onbeforeprint", "onbeforeunload", "onhashchange", "onlanguagechange",
    "onmessage", "onmessageerror", "onoffline", "ononline", "onpagehide", "onpageshow",
    "onpopstate", "onrejectionhandled", "onstorage", "onunhandledrejection", "onunload",
];

/// Event handler names shared by every window, built once
pub fn event_handler_names() -> &'static HashSet<&'static str> {
    static NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();
    NAMES.get_or_init(|| {
        GLOBAL_EVENT_HANDLERS
            .iter()
            .chain(WINDOW_EVENT_HANDLERS)
            .copied()
            .collect()
    })
}

/// Elements whose URL attribute is handed to the resource loader after parsing
const SUBRESOURCES: [(&str, &str); 4] = [("script", "src"), ("link", "href"), ("img", "src"), ("iframe", "src")];

/// Window lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Constructing,
    Active,
    Closing,
    Closed,
}

/// Result of a named property lookup
#[derive(Debug, Clone)]
pub enum NamedItem {
    /// Nested browsing context of a matching `iframe`/`frame`
    Window(Window),
    Element(NodeId),
    /// Several matches; live over the document
    Collection(CollectionId),
}

pub(crate) struct WindowInner {
    pub(crate) self_ref: Weak<WindowInner>,
    name: RefCell<String>,
    state: Cell<WindowState>,
    pub(crate) options: WindowOptions,
    document: RefCell<Option<Document>>,
    history: RefCell<SessionHistory>,
    timers: RefCell<TimerTables>,
    listeners: RefCell<EventListeners>,
    handlers: RefCell<HashMap<&'static str, Listener>>,
    /// Listener ids handed out to script, by slot
    pub(crate) script_listeners: RefCell<Vec<Option<ListenerId>>>,
    frames: RefCell<Vec<(NodeId, Window)>>,
    parent: Option<Weak<WindowInner>>,
    frame_element: Option<NodeId>,
    created_at: Duration,
    // last: captured script functions above must drop first
    pub(crate) script: OnceCell<ScriptContext>,
}

/// Handle to a window; clones share the same browsing context
#[derive(Clone)]
pub struct Window(pub(crate) Rc<WindowInner>);

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("name", &*self.0.name.borrow())
            .field("state", &self.0.state.get())
            .field("frames", &self.0.frames.borrow().len())
            .finish_non_exhaustive()
    }
}

pub(crate) fn upgrade(weak: &Weak<WindowInner>) -> Option<Window> {
    weak.upgrade().map(Window)
}

/// Parse `markup` into a fresh document and start its subresource requests
fn build_document(markup: &str, options: &WindowOptions) -> Result<Document, WindowError> {
    let mut document = Document::new(options.document_options())?;
    match options.parsing_mode {
        ParsingMode::Html => HtmlParser::new()
            .with_scripting(options.scripting.is_enabled())
            .parse_into(&mut document, markup)?,
        ParsingMode::Xml => {
            if let XmlOutcome::Malformed(message) = XmlParser::new().parse_into(&mut document, markup)? {
                tracing::debug!(%message, "Window document is not well-formed");
            }
        }
    }

    let requests: Vec<(NodeId, String)> = document
        .tree()
        .descendants(document.root())
        .filter_map(|(id, node)| {
            let element = node.as_element()?;
            let (_, attr) = SUBRESOURCES
                .iter()
                .find(|(tag, _)| element.is(ns::HTML, tag))?;
            element.get_attr(attr).map(|url| (id, url.to_string()))
        })
        .collect();
    for (element, url) in requests {
        document.fetch_resource(element, &url);
    }

    if document.request_manager().size() == 0 {
        document.close();
    }
    Ok(document)
}

/// Same document origin as far as history URLs are concerned
fn same_history_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.username() == b.username()
        && a.password() == b.password()
        && a.host() == b.host()
        && a.port_or_known_default() == b.port_or_known_default()
}

impl Window {
    /// Window over an empty HTML document
    pub fn new(options: WindowOptions) -> Result<Self, WindowError> {
        Self::from_markup("", options)
    }

    /// Window whose document is parsed from `markup`
    pub fn from_markup(markup: &str, options: WindowOptions) -> Result<Self, WindowError> {
        Self::build(markup, options, None, None)
    }

    fn build(
        markup: &str,
        options: WindowOptions,
        parent: Option<Weak<WindowInner>>,
        frame_element: Option<NodeId>,
    ) -> Result<Self, WindowError> {
        tracing::debug!(url = %options.url, name = %options.name, "Constructing window");

        let document = build_document(markup, &options)?;
        let initial = HistoryEntry {
            document: document.id(),
            url: document.url().clone(),
            title: document.title(),
            state: None,
        };
        let created_at = options.scheduler.now();

        let inner = Rc::new_cyclic(|weak| WindowInner {
            self_ref: weak.clone(),
            name: RefCell::new(options.name.clone()),
            state: Cell::new(WindowState::Constructing),
            options,
            document: RefCell::new(Some(document)),
            history: RefCell::new(SessionHistory::new(initial)),
            timers: RefCell::new(TimerTables::new()),
            listeners: RefCell::new(EventListeners::new()),
            handlers: RefCell::new(HashMap::new()),
            script_listeners: RefCell::new(Vec::new()),
            frames: RefCell::new(Vec::new()),
            parent,
            frame_element,
            created_at,
            script: OnceCell::new(),
        });
        let window = Window(inner);

        // load is never signalled during construction
        window.schedule(Duration::ZERO, Recurrence::Once, |w| w.initial_turn());
        window.0.state.set(WindowState::Active);

        if window.0.options.scripting.runs_document_scripts() {
            window.run_document_scripts();
        }
        Ok(window)
    }

    fn schedule(&self, delay: Duration, recurrence: Recurrence, f: impl Fn(&Window) + 'static) -> HostHandle {
        let weak = self.0.self_ref.clone();
        self.0.options.scheduler.schedule(
            delay,
            recurrence,
            Rc::new(move || {
                if let Some(window) = upgrade(&weak) {
                    f(&window);
                }
            }),
        )
    }

    /// Whether two handles refer to the same window
    pub fn ptr_eq(&self, other: &Window) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ----- state -----

    pub fn state(&self) -> WindowState {
        self.0.state.get()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == WindowState::Closed
    }

    /// Constructing or active: new work may still be registered
    pub(crate) fn is_live(&self) -> bool {
        matches!(self.state(), WindowState::Constructing | WindowState::Active)
    }

    /// `window.name`
    pub fn name(&self) -> String {
        self.0.name.borrow().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.0.name.borrow_mut() = name.to_string();
    }

    // ----- document -----

    /// The document; `None` once the window is closed
    pub fn document(&self) -> Option<Ref<'_, Document>> {
        Ref::filter_map(self.0.document.borrow(), Option::as_ref).ok()
    }

    pub fn document_mut(&self) -> Option<RefMut<'_, Document>> {
        RefMut::filter_map(self.0.document.borrow_mut(), Option::as_mut).ok()
    }

    fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> Result<R, DomError>) -> Result<R, WindowError> {
        let mut document = self.document_mut().ok_or(WindowError::Closed)?;
        Ok(f(&mut document)?)
    }

    /// Mark the document complete and fire its `load` event
    pub fn complete_document(&self) -> Result<(), WindowError> {
        let changed = self.document_mut().ok_or(WindowError::Closed)?.close();
        if changed {
            self.dispatch_document_event(&Event::new("load"));
        }
        Ok(())
    }

    fn initial_turn(&self) {
        if !self.is_live() {
            return;
        }
        let complete = match self.document() {
            Some(document) => document.ready_state() == ReadyState::Complete,
            None => return,
        };

        if complete {
            self.fire_load();
            return;
        }

        let weak = self.0.self_ref.clone();
        let listener: Listener = Rc::new(move |_| {
            if let Some(window) = upgrade(&weak) {
                window.fire_load();
            }
            Ok(())
        });
        if let Some(mut document) = self.document_mut() {
            document.listeners_mut().add("load", listener);
        }
    }

    fn fire_load(&self) {
        tracing::debug!(name = %self.name(), "Window load");
        self.dispatch_event(&Event::new("load"));
    }

    // ----- events -----

    /// `addEventListener`
    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) -> anyhow::Result<()> + 'static,
    ) -> ListenerId {
        self.0.listeners.borrow_mut().add(event_type, Rc::new(listener))
    }

    /// `removeEventListener`; returns whether the listener was registered
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.0.listeners.borrow_mut().remove(id)
    }

    /// Set or clear an `on*` event handler
    pub fn set_event_handler(&self, name: &str, handler: Option<Listener>) -> Result<(), DomError> {
        let key = event_handler_names()
            .get(name)
            .copied()
            .ok_or_else(|| DomError::Type(format!("'{name}' is not an event handler of Window")))?;
        let mut handlers = self.0.handlers.borrow_mut();
        match handler {
            Some(handler) => {
                handlers.insert(key, handler);
            }
            None => {
                handlers.remove(key);
            }
        }
        Ok(())
    }

    pub fn has_event_handler(&self, name: &str) -> bool {
        self.0.handlers.borrow().contains_key(name)
    }

    /// Dispatch `event` to listeners, then the matching `on*` handler
    ///
    /// Listener errors are routed to the diagnostic sink.
    pub fn dispatch_event(&self, event: &Event) {
        if self.is_closed() {
            return;
        }
        let mut listeners = self.0.listeners.borrow().listeners_for(&event.event_type);
        let handler_name = format!("on{}", event.event_type);
        if let Some(handler) = self.0.handlers.borrow().get(handler_name.as_str()) {
            listeners.push(Rc::clone(handler));
        }

        for error in invoke_listeners(&listeners, event) {
            self.report_error(error);
        }
        self.dispatch_to_script_handler(event);
    }

    fn dispatch_document_event(&self, event: &Event) {
        let listeners = match self.document() {
            Some(document) => document.listeners().listeners_for(&event.event_type),
            None => return,
        };
        for error in invoke_listeners(&listeners, event) {
            self.report_error(error);
        }
    }

    /// Route an uncaught callback error to the sink
    pub(crate) fn report_error(&self, error: anyhow::Error) {
        let name = self.name();
        let url = self.location().map(String::from).unwrap_or_default();
        tracing::warn!(window = %name, %url, "Uncaught error in callback: {error:#}");
        self.0
            .options
            .sink
            .emit(RUNTIME_ERROR, &[format!("Uncaught {error:#}"), name, url]);
    }

    pub(crate) fn not_implemented(&self, what: &str) {
        tracing::debug!(what, "Not implemented");
        self.0
            .options
            .sink
            .emit(NOT_IMPLEMENTED, &[format!("Not implemented: {what}")]);
    }

    // ----- messaging -----

    /// `postMessage(data, targetOrigin)`
    ///
    /// Delivery happens on a later turn. A target origin that does not match
    /// the window's origin drops the message silently.
    pub fn post_message(&self, data: Value, target_origin: &str) -> Result<(), WindowError> {
        if !self.is_live() {
            return Err(WindowError::Closed);
        }

        match target_origin {
            "*" => {}
            "/" => {
                self.not_implemented("postMessage with targetOrigin \"/\"");
                return Ok(());
            }
            other => {
                let target = Url::parse(other).map_err(|e| {
                    DomError::Syntax(format!("Failed to parse target origin '{other}' in window.postMessage: {e}"))
                })?;
                if target.origin().ascii_serialization() != self.origin() {
                    tracing::trace!(target = other, "postMessage origin mismatch");
                    return Ok(());
                }
            }
        }

        self.schedule(Duration::ZERO, Recurrence::Once, move |w| {
            w.dispatch_event(&Event::message(data.clone()));
        });
        Ok(())
    }

    // ----- teardown -----

    /// Tear the window down; idempotent
    pub fn close(&self) {
        if matches!(self.state(), WindowState::Closing | WindowState::Closed) {
            return;
        }
        tracing::debug!(name = %self.name(), "Closing window");
        self.0.state.set(WindowState::Closing);

        let frames: Vec<Window> = self.0.frames.borrow_mut().drain(..).map(|(_, w)| w).collect();
        for frame in frames {
            frame.close();
        }

        self.0.listeners.borrow_mut().clear();
        self.0.handlers.borrow_mut().clear();
        self.0.script_listeners.borrow_mut().clear();
        if let Some(mut document) = self.document_mut() {
            document.listeners_mut().clear();
            if let Some(body) = document.body() {
                document.remove_all_children(body);
            }
            document.close();
            document.request_manager_mut().close();
        }

        self.stop_all_timers();
        self.0.document.borrow_mut().take();
        self.0.state.set(WindowState::Closed);
    }

    /// `window.stop()`: abort open requests
    pub fn stop(&self) {
        if let Some(mut document) = self.document_mut() {
            document.request_manager_mut().close();
        }
    }

    // ----- timers -----

    /// `setTimeout`; `None` once the window is closing
    pub fn set_timeout(&self, handler: TimerHandler, delay_ms: f64) -> Option<u32> {
        self.register_timer(handler, delay_ms, Recurrence::Once)
    }

    /// `setInterval`; `None` once the window is closing
    pub fn set_interval(&self, handler: TimerHandler, delay_ms: f64) -> Option<u32> {
        self.register_timer(handler, delay_ms, Recurrence::Repeat)
    }

    fn register_timer(&self, handler: TimerHandler, delay_ms: f64, recurrence: Recurrence) -> Option<u32> {
        if !self.is_live() {
            return None;
        }
        let id = self.0.timers.borrow_mut().allocate_id();
        let host = self.schedule(normalize_delay(delay_ms), recurrence, move |w| w.fire_timer(id));
        self.0
            .timers
            .borrow_mut()
            .insert_timer(id, host, handler, recurrence == Recurrence::Repeat);
        tracing::trace!(id, delay_ms, ?recurrence, "Timer registered");
        Some(id)
    }

    /// `clearTimeout`; unknown ids and frame ids are ignored
    pub fn clear_timeout(&self, id: u32) {
        let host = self.0.timers.borrow_mut().remove_timer(id);
        if let Some(host) = host {
            self.0.options.scheduler.cancel(host);
        }
    }

    /// `clearInterval`
    pub fn clear_interval(&self, id: u32) {
        self.clear_timeout(id);
    }

    fn fire_timer(&self, id: u32) {
        let handler = self.0.timers.borrow_mut().take_due_timer(id);
        let Some(handler) = handler else {
            return;
        };
        tracing::trace!(id, "Running timer");

        let result = match handler {
            TimerHandler::Native(f) => f(),
            TimerHandler::Source(source) => self.run_handler_source(&source),
            TimerHandler::Script(function, args) => self
                .script_context()
                .and_then(|ctx| Ok(ctx.call(&function, args)?))
                .map(drop)
                .map_err(anyhow::Error::from),
        };
        if let Err(error) = result {
            self.report_error(error);
        }
    }

    fn run_handler_source(&self, source: &str) -> anyhow::Result<()> {
        if !self.0.options.scripting.is_enabled() {
            self.not_implemented("string timer handlers without scripting");
            return Ok(());
        }
        self.evaluate(source)?;
        Ok(())
    }

    /// `requestAnimationFrame`: one-shot, on the next frame boundary
    pub fn request_animation_frame(&self, handler: FrameHandler) -> Option<u32> {
        if !self.is_live() {
            return None;
        }
        let id = self.0.timers.borrow_mut().allocate_id();
        let host = self.schedule(FRAME_INTERVAL, Recurrence::Once, move |w| w.fire_frame(id));
        self.0.timers.borrow_mut().insert_frame(id, host, handler);
        Some(id)
    }

    /// `cancelAnimationFrame`; timer ids are ignored
    pub fn cancel_animation_frame(&self, id: u32) {
        let host = self.0.timers.borrow_mut().remove_frame(id);
        if let Some(host) = host {
            self.0.options.scheduler.cancel(host);
        }
    }

    fn fire_frame(&self, id: u32) {
        let handler = self.0.timers.borrow_mut().take_due_frame(id);
        let Some(handler) = handler else {
            return;
        };
        let elapsed = self.performance_now();
        tracing::trace!(id, elapsed, "Running animation frame");

        let result = match handler {
            FrameHandler::Native(f) => f(elapsed),
            FrameHandler::Script(function) => self
                .script_context()
                .and_then(|ctx| Ok(ctx.call(&function, vec![elapsed.into()])?))
                .map(drop)
                .map_err(anyhow::Error::from),
        };
        if let Err(error) = result {
            self.report_error(error);
        }
    }

    fn stop_all_timers(&self) {
        let hosts = self.0.timers.borrow_mut().drain();
        for host in hosts {
            self.0.options.scheduler.cancel(host);
        }
    }

    /// Registered timers and frames
    pub fn pending_timers(&self) -> usize {
        let timers = self.0.timers.borrow();
        timers.timer_count() + timers.frame_count()
    }

    /// Milliseconds since the window was created
    pub fn performance_now(&self) -> f64 {
        let now = self.0.options.scheduler.now();
        now.saturating_sub(self.0.created_at).as_secs_f64() * 1000.0
    }

    // ----- session history -----

    /// `history.pushState`
    pub fn push_state(&self, state: Option<Value>, title: &str, url: Option<&str>) -> Result<(), WindowError> {
        self.update_history(state, title, url, true)
    }

    /// `history.replaceState`
    pub fn replace_state(&self, state: Option<Value>, title: &str, url: Option<&str>) -> Result<(), WindowError> {
        self.update_history(state, title, url, false)
    }

    fn update_history(
        &self,
        state: Option<Value>,
        title: &str,
        url: Option<&str>,
        push: bool,
    ) -> Result<(), WindowError> {
        let (document_id, new_url) = {
            let document = self.document().ok_or(WindowError::Closed)?;
            let current = document.url();
            let new_url = match url {
                Some(url) => {
                    let resolved = current.join(url)?;
                    if !same_history_origin(&resolved, current) {
                        return Err(DomError::Security(format!(
                            "A history state object with URL '{resolved}' cannot be created in a document with origin '{}' and URL '{current}'.",
                            document.origin()
                        ))
                        .into());
                    }
                    resolved
                }
                None => current.clone(),
            };
            (document.id(), new_url)
        };

        if let Some(mut document) = self.document_mut() {
            document.set_url(new_url.clone());
        }
        let entry = HistoryEntry {
            document: document_id,
            url: new_url,
            title: title.to_string(),
            state,
        };
        let mut history = self.0.history.borrow_mut();
        if push {
            history.push(entry);
        } else {
            history.replace(entry);
        }
        tracing::debug!(push, index = history.index(), len = history.len(), "History updated");
        Ok(())
    }

    /// `history.back()`
    pub fn back(&self) {
        self.go(-1);
    }

    /// `history.forward()`
    pub fn forward(&self) {
        self.go(1);
    }

    /// `history.go(delta)`; traversal happens on a later turn
    pub fn go(&self, delta: i64) {
        if !self.is_live() {
            return;
        }
        if delta == 0 {
            self.not_implemented("location.reload()");
            return;
        }
        self.schedule(Duration::ZERO, Recurrence::Once, move |w| w.traverse_history(delta));
    }

    fn traverse_history(&self, delta: i64) {
        if !self.is_live() {
            return;
        }
        let entry = self.0.history.borrow_mut().go(delta).cloned();
        let Some(entry) = entry else {
            return;
        };
        tracing::debug!(delta, url = %entry.url, "Traversing session history");

        if let Some(mut document) = self.document_mut() {
            if document.id() == entry.document {
                document.set_url(entry.url.clone());
            }
        }
        self.dispatch_event(&Event::pop_state(entry.state));
    }

    /// `history.length`
    pub fn history_length(&self) -> usize {
        self.0.history.borrow().len()
    }

    /// `history.state`
    pub fn history_state(&self) -> Option<Value> {
        self.0.history.borrow().current().state.clone()
    }

    // ----- named properties and nested browsing contexts -----

    /// `window[name]`
    pub fn named_item(&self, name: &str) -> Option<NamedItem> {
        if name.is_empty() {
            return None;
        }
        let document = self.document()?;
        {
            let frames = self.0.frames.borrow();
            for (id, node) in document.tree().descendants(document.root()) {
                let Some(element) = node.as_element() else {
                    continue;
                };
                if !(element.is(ns::HTML, "iframe") || element.is(ns::HTML, "frame")) {
                    continue;
                }
                let attached = frames.iter().find(|(frame, _)| *frame == id);
                if let Some((_, window)) = attached {
                    if window.name() == name || element.get_attr("name") == Some(name) {
                        return Some(NamedItem::Window(window.clone()));
                    }
                }
            }
        }

        let objects = document.named_objects(name);
        let items = document.collection_items(objects);
        match items.len() {
            0 => None,
            1 => Some(NamedItem::Element(items[0])),
            _ => Some(NamedItem::Collection(objects)),
        }
    }

    /// Attach a nested browsing context to an `iframe` or `frame` element
    ///
    /// An empty `name` takes the element's `name` attribute.
    pub fn create_nested_window(&self, frame_element: NodeId, name: &str) -> Result<Window, WindowError> {
        if !self.is_live() {
            return Err(WindowError::Closed);
        }
        let name = {
            let document = self.document().ok_or(WindowError::Closed)?;
            let element = document
                .tree()
                .element(frame_element)
                .filter(|el| el.is(ns::HTML, "iframe") || el.is(ns::HTML, "frame"))
                .ok_or_else(|| DomError::Type("Nested browsing contexts need an iframe or frame element".into()))?;
            match name {
                "" => element.get_attr("name").unwrap_or_default().to_string(),
                name => name.to_string(),
            }
        };

        let options = self.0.options.nested(&name);
        let child = Window::build("", options, Some(self.0.self_ref.clone()), Some(frame_element))?;
        self.0.frames.borrow_mut().push((frame_element, child.clone()));
        Ok(child)
    }

    /// `window.length`
    pub fn length(&self) -> usize {
        self.0.frames.borrow().len()
    }

    /// `window[index]`
    pub fn frame(&self, index: usize) -> Option<Window> {
        self.0.frames.borrow().get(index).map(|(_, w)| w.clone())
    }

    /// `window.parent`; a top-level window is its own parent
    pub fn parent(&self) -> Window {
        self.0
            .parent
            .as_ref()
            .and_then(upgrade)
            .unwrap_or_else(|| self.clone())
    }

    /// `window.top`
    pub fn top(&self) -> Window {
        let mut current = self.clone();
        while let Some(parent) = current.0.parent.as_ref().and_then(upgrade) {
            current = parent;
        }
        current
    }

    /// `window.frameElement`, in the parent's document
    pub fn frame_element(&self) -> Option<NodeId> {
        self.0.frame_element
    }

    // ----- element constructors -----

    /// `new Option(text, value, defaultSelected)`
    pub fn create_option(&self, text: &str, value: Option<&str>, default_selected: bool) -> Result<NodeId, WindowError> {
        self.with_document_mut(|document| {
            let option = document.create_element_ns(Some(ns::HTML), "option")?;
            if !text.is_empty() {
                let text = document.create_text_node(text);
                document.append_child(option, text)?;
            }
            if let Some(value) = value {
                document.set_attribute(option, "value", value)?;
            }
            if default_selected {
                document.set_attribute(option, "selected", "")?;
            }
            Ok(option)
        })
    }

    /// `new Image(width, height)`
    pub fn create_image(&self, width: Option<u32>, height: Option<u32>) -> Result<NodeId, WindowError> {
        self.with_document_mut(|document| {
            let image = document.create_element_ns(Some(ns::HTML), "img")?;
            if let Some(width) = width {
                document.set_attribute(image, "width", &width.to_string())?;
            }
            if let Some(height) = height {
                document.set_attribute(image, "height", &height.to_string())?;
            }
            Ok(image)
        })
    }

    /// `new Audio(src)`
    pub fn create_audio(&self, src: Option<&str>) -> Result<NodeId, WindowError> {
        self.with_document_mut(|document| {
            let audio = document.create_element_ns(Some(ns::HTML), "audio")?;
            document.set_attribute(audio, "preload", "auto")?;
            if let Some(src) = src {
                document.set_attribute(audio, "src", src)?;
            }
            Ok(audio)
        })
    }

    // ----- encoding -----

    pub fn btoa(&self, data: &str) -> Result<String, DomError> {
        crate::encoding::btoa(data)
    }

    pub fn atob(&self, data: &str) -> Result<String, DomError> {
        crate::encoding::atob(data)
    }

    // ----- legacy operations -----

    pub fn open(&self, _url: &str, _target: &str) -> Option<Window> {
        self.not_implemented("window.open");
        None
    }

    pub fn alert(&self, _message: &str) {
        self.not_implemented("window.alert");
    }

    pub fn confirm(&self, _message: &str) -> bool {
        self.not_implemented("window.confirm");
        false
    }

    pub fn prompt(&self, _message: &str, _default: &str) -> Option<String> {
        self.not_implemented("window.prompt");
        None
    }

    pub fn print(&self) {
        self.not_implemented("window.print");
    }

    pub fn focus(&self) {
        self.not_implemented("window.focus");
    }

    pub fn blur(&self) {
        self.not_implemented("window.blur");
    }

    pub fn move_to(&self, _x: i32, _y: i32) {
        self.not_implemented("window.moveTo");
    }

    pub fn move_by(&self, _dx: i32, _dy: i32) {
        self.not_implemented("window.moveBy");
    }

    pub fn resize_to(&self, _width: i32, _height: i32) {
        self.not_implemented("window.resizeTo");
    }

    pub fn resize_by(&self, _dx: i32, _dy: i32) {
        self.not_implemented("window.resizeBy");
    }

    pub fn scroll(&self, _x: f64, _y: f64) {
        self.not_implemented("window.scroll");
    }

    pub fn scroll_to(&self, _x: f64, _y: f64) {
        self.not_implemented("window.scrollTo");
    }

    pub fn scroll_by(&self, _dx: f64, _dy: f64) {
        self.not_implemented("window.scrollBy");
    }

    pub fn create_popup(&self) {
        self.not_implemented("window.createPopup");
    }

    pub fn capture_events(&self) {}

    pub fn release_events(&self) {}

    // ----- metrics -----

    pub fn inner_width(&self) -> u32 {
        INNER_WIDTH
    }

    pub fn inner_height(&self) -> u32 {
        INNER_HEIGHT
    }

    pub fn outer_width(&self) -> u32 {
        OUTER_WIDTH
    }

    pub fn outer_height(&self) -> u32 {
        OUTER_HEIGHT
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    pub fn scroll_x(&self) -> f64 {
        0.0
    }

    pub fn scroll_y(&self) -> f64 {
        0.0
    }

    pub fn page_x_offset(&self) -> f64 {
        self.scroll_x()
    }

    pub fn page_y_offset(&self) -> f64 {
        self.scroll_y()
    }

    pub fn screen_x(&self) -> i32 {
        0
    }

    pub fn screen_y(&self) -> i32 {
        0
    }

    // ----- location -----

    pub fn navigator(&self) -> Navigator {
        Navigator::new(&self.0.options.user_agent)
    }

    /// Document URL; `None` once closed
    pub fn location(&self) -> Option<Url> {
        self.document().map(|document| document.url().clone())
    }

    /// Serialized origin of the document (`"null"` when opaque or closed)
    pub fn origin(&self) -> String {
        self.document()
            .map(|document| document.origin())
            .unwrap_or_else(|| "null".to_string())
    }

    /// `new DOMParser()` bound to the window's URL
    pub fn dom_parser(&self) -> DomParser {
        match self.location() {
            Some(url) => DomParser::with_url(&url),
            None => DomParser::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::VirtualClock;
    use std::cell::RefCell;

    fn window_with_clock(url: &str) -> (Window, Rc<VirtualClock>) {
        let clock = Rc::new(VirtualClock::new());
        let window = Window::new(WindowOptions {
            url: url.into(),
            scheduler: clock.clone(),
            ..Default::default()
        })
        .unwrap();
        (window, clock)
    }

    #[test]
    fn test_construction_state() {
        let (window, clock) = window_with_clock("https://example.com/");
        assert_eq!(window.state(), WindowState::Active);
        assert!(window.document().unwrap().body().is_some());
        assert_eq!(window.document().unwrap().ready_state(), ReadyState::Complete);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_load_not_during_construction() {
        let (window, clock) = window_with_clock("about:blank");
        let fired = Rc::new(Cell::new(0));
        let count = Rc::clone(&fired);
        window.add_event_listener("load", move |_| {
            count.set(count.get() + 1);
            Ok(())
        });
        assert_eq!(fired.get(), 0);
        clock.run_until_idle(10);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_event_handler_names() {
        let (window, _) = window_with_clock("about:blank");
        assert!(window
            .set_event_handler("onmessage", Some(Rc::new(|_: &Event| -> anyhow::Result<()> { Ok(()) })))
            .is_ok());
        assert!(window.has_event_handler("onmessage"));
        assert_eq!(
            window.set_event_handler("onbogus", None).unwrap_err().name(),
            "TypeError"
        );
        window.set_event_handler("onmessage", None).unwrap();
        assert!(!window.has_event_handler("onmessage"));
    }

    #[test]
    fn test_same_history_origin() {
        let a = Url::parse("https://example.com/a").unwrap();
        assert!(same_history_origin(&a, &a.join("/b?q#f").unwrap()));
        assert!(!same_history_origin(&a, &Url::parse("https://other.com/").unwrap()));
        assert!(!same_history_origin(&a, &Url::parse("http://example.com/").unwrap()));
    }

    #[test]
    fn test_listener_errors_reported() {
        let clock = Rc::new(VirtualClock::new());
        let console = Rc::new(crate::VirtualConsole::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let errors = Rc::clone(&seen);
        console.on(RUNTIME_ERROR, move |args| errors.borrow_mut().push(args.to_vec()));

        let window = Window::new(WindowOptions {
            name: "main".into(),
            url: "https://example.com/".into(),
            scheduler: clock.clone(),
            sink: console,
            ..Default::default()
        })
        .unwrap();
        window.add_event_listener("load", |_| anyhow::bail!("listener failed"));
        clock.run_until_idle(10);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0][0].contains("listener failed"));
        assert_eq!(seen[0][1], "main");
        assert_eq!(seen[0][2], "https://example.com/");
    }
}
