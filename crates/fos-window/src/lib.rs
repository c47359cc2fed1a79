//! fOS Window
//!
//! Headless browsing context on top of `fos-dom`: document lifecycle,
//! session history, timers and animation frames, nested frames and the
//! QuickJS script surface.
//!
//! # Example
//! ```rust,ignore
//! use std::rc::Rc;
//! use fos_window::{VirtualClock, Window, WindowOptions};
//!
//! let clock = Rc::new(VirtualClock::new());
//! let window = Window::from_markup("<p id=a>hi</p>", WindowOptions {
//!     url: "https://example.com/".into(),
//!     scheduler: clock.clone(),
//!     ..Default::default()
//! })?;
//! clock.run_until_idle(100);
//! window.close();
//! ```

mod config;
mod console;
mod encoding;
mod error;
mod history;
mod navigator;
mod scheduler;
mod script;
mod timers;
mod window;

pub use config::WindowOptions;
pub use console::{DiagnosticSink, NoopSink, VirtualConsole, NOT_IMPLEMENTED, RUNTIME_ERROR};
pub use encoding::{atob, btoa};
pub use error::WindowError;
pub use history::{HistoryEntry, SessionHistory};
pub use navigator::Navigator;
pub use scheduler::{HostHandle, Recurrence, Scheduler, SmolScheduler, Task, VirtualClock, MIN_REPEAT_PERIOD};
pub use timers::{normalize_delay, FrameHandler, TimerHandler, FRAME_INTERVAL, MAX_DELAY_MS};
pub use window::{
    event_handler_names, NamedItem, Window, WindowState, INNER_HEIGHT, INNER_WIDTH, OUTER_HEIGHT, OUTER_WIDTH,
};

pub use fos_js::{JsError, JsValue, ScriptingMode};

/// Engine version reported in the default user agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
