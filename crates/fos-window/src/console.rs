//! Diagnostic sink
//!
//! Script console output, uncaught callback errors and not-implemented
//! notices all leave the window through a [`DiagnosticSink`] channel.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Errors raised by deferred callbacks
pub const RUNTIME_ERROR: &str = "runtimeError";
/// Calls into operations the window does not implement
pub const NOT_IMPLEMENTED: &str = "notImplemented";

/// Receiver of window diagnostics
///
/// Emissions can happen while script is running; a sink must not evaluate
/// script in the emitting window.
pub trait DiagnosticSink {
    /// `channel` is a console method name or one of the channel constants
    fn emit(&self, channel: &str, args: &[String]);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn emit(&self, _channel: &str, _args: &[String]) {}
}

type ChannelHandler = Rc<dyn Fn(&[String])>;

/// Sink with per-channel handlers, optionally mirrored to `tracing`
#[derive(Default)]
pub struct VirtualConsole {
    handlers: RefCell<Vec<(String, ChannelHandler)>>,
    to_tracing: Cell<bool>,
}

impl std::fmt::Debug for VirtualConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualConsole")
            .field("handlers", &self.handlers.borrow().len())
            .field("to_tracing", &self.to_tracing.get())
            .finish()
    }
}

impl VirtualConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every emission on `channel`
    pub fn on(&self, channel: &str, handler: impl Fn(&[String]) + 'static) -> &Self {
        self.handlers
            .borrow_mut()
            .push((channel.to_string(), Rc::new(handler)));
        self
    }

    /// Forward every channel to `tracing`
    pub fn send_to_tracing(&self) -> &Self {
        self.to_tracing.set(true);
        self
    }
}

impl DiagnosticSink for VirtualConsole {
    fn emit(&self, channel: &str, args: &[String]) {
        if self.to_tracing.get() {
            let text = args.join(" ");
            match channel {
                "error" | RUNTIME_ERROR => tracing::error!("[{}] {}", channel, text),
                "warn" | NOT_IMPLEMENTED => tracing::warn!("[{}] {}", channel, text),
                "debug" | "trace" => tracing::debug!("[{}] {}", channel, text),
                _ => tracing::info!("[{}] {}", channel, text),
            }
        }

        let matching: Vec<ChannelHandler> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in matching {
            handler(args);
        }
    }
}

/// Adapts a diagnostic sink to the script console
#[derive(Clone)]
pub(crate) struct ScriptConsole(pub(crate) Rc<dyn DiagnosticSink>);

impl fos_js::ConsoleSink for ScriptConsole {
    fn message(&self, method: &str, text: &str) {
        self.0.emit(method, &[text.to_string()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_by_channel() {
        let console = VirtualConsole::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let errors = Rc::clone(&seen);
        console.on(RUNTIME_ERROR, move |args| errors.borrow_mut().push(args.join("|")));

        console.emit("log", &["ignored".into()]);
        console.emit(RUNTIME_ERROR, &["boom".into(), "win".into()]);
        assert_eq!(*seen.borrow(), ["boom|win"]);
    }

    #[test]
    fn test_handler_may_register_more() {
        let console = Rc::new(VirtualConsole::new());
        let inner = Rc::clone(&console);
        console.on("log", move |_| {
            inner.on("log", |_| {});
        });
        console.emit("log", &[]);
        console.send_to_tracing().emit("log", &["x".into()]);
        assert_eq!(console.handlers.borrow().len(), 3);
    }
}
