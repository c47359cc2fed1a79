//! DOM Events
//!
//! Event objects and listener registries shared by documents and windows.
//! Listeners return `anyhow::Result<()>`; the dispatcher collects errors
//! instead of propagating them.

use std::rc::Rc;

use serde_json::Value;

/// Payload carried by an event
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// `message` event data
    Message { data: Value },
    /// `popstate` event state
    PopState { state: Option<Value> },
}

/// A dispatched event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub bubbles: bool,
    pub cancelable: bool,
    pub detail: EventDetail,
}

impl Event {
    /// Plain event with no payload
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            bubbles: false,
            cancelable: false,
            detail: EventDetail::None,
        }
    }

    /// `message` event carrying `data`
    pub fn message(data: Value) -> Self {
        Self {
            detail: EventDetail::Message { data },
            ..Self::new("message")
        }
    }

    /// `popstate` event carrying a history entry state
    pub fn pop_state(state: Option<Value>) -> Self {
        Self {
            bubbles: true,
            detail: EventDetail::PopState { state },
            ..Self::new("popstate")
        }
    }

    /// Message data, if this is a message event
    pub fn data(&self) -> Option<&Value> {
        match &self.detail {
            EventDetail::Message { data } => Some(data),
            _ => None,
        }
    }

    /// History state, if this is a popstate event
    pub fn state(&self) -> Option<&Value> {
        match &self.detail {
            EventDetail::PopState { state } => state.as_ref(),
            _ => None,
        }
    }
}

/// Event listener callback
pub type Listener = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

/// Handle returned by [`EventListeners::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered listener registry
#[derive(Default)]
pub struct EventListeners {
    entries: Vec<(ListenerId, String, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event_type`
    pub fn add(&mut self, event_type: &str, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, event_type.to_string(), listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    /// Snapshot of the listeners for `event_type`, in registration order
    ///
    /// Callers invoke the snapshot after releasing any borrow of the registry.
    pub fn listeners_for(&self, event_type: &str) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(_, ty, _)| ty == event_type)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect()
    }

    /// Drop every listener
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Invoke a listener snapshot, collecting errors
pub fn invoke_listeners(listeners: &[Listener], event: &Event) -> Vec<anyhow::Error> {
    listeners
        .iter()
        .filter_map(|listener| listener(event).err())
        .collect()
}
