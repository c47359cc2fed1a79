//! Timer and animation-frame tables
//!
//! `setTimeout`, `setInterval` and `requestAnimationFrame` share one id
//! counter per window but live in separate tables, so an id can only be
//! cancelled through the API that created it.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use fos_js::{JsValue, ScriptFunction};

use crate::scheduler::HostHandle;

/// Animation frame period (60 Hz)
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Timer callback
#[derive(Clone)]
pub enum TimerHandler {
    Native(Rc<dyn Fn() -> anyhow::Result<()>>),
    /// Source evaluated in the window's script context
    Source(String),
    /// Captured script function and its extra arguments
    Script(ScriptFunction, Vec<JsValue>),
}

impl TimerHandler {
    pub fn native(f: impl Fn() -> anyhow::Result<()> + 'static) -> Self {
        Self::Native(Rc::new(f))
    }
}

impl fmt::Debug for TimerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Source(source) => f.debug_tuple("Source").field(source).finish(),
            Self::Script(_, args) => f.debug_tuple("Script").field(&args.len()).finish(),
        }
    }
}

/// Animation frame callback; receives milliseconds since window creation
#[derive(Clone)]
pub enum FrameHandler {
    Native(Rc<dyn Fn(f64) -> anyhow::Result<()>>),
    Script(ScriptFunction),
}

impl FrameHandler {
    pub fn native(f: impl Fn(f64) -> anyhow::Result<()> + 'static) -> Self {
        Self::Native(Rc::new(f))
    }
}

impl fmt::Debug for FrameHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Script(_) => f.write_str("Script(..)"),
        }
    }
}

/// Longest accepted delay in milliseconds (a signed 32-bit count)
pub const MAX_DELAY_MS: f64 = i32::MAX as f64;

/// `setTimeout` delay: NaN, negative and out-of-range values become zero
pub fn normalize_delay(delay_ms: f64) -> Duration {
    if !(delay_ms > 0.0 && delay_ms <= MAX_DELAY_MS) {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::ZERO)
}

#[derive(Debug)]
struct TimerEntry {
    host: HostHandle,
    handler: TimerHandler,
    repeating: bool,
}

#[derive(Debug)]
struct FrameEntry {
    host: HostHandle,
    handler: FrameHandler,
}

/// Timer and animation-frame tables of one window
#[derive(Debug, Default)]
pub struct TimerTables {
    next_id: u32,
    timers: HashMap<u32, TimerEntry>,
    frames: HashMap<u32, FrameEntry>,
}

impl TimerTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id from the shared counter
    pub fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert_timer(&mut self, id: u32, host: HostHandle, handler: TimerHandler, repeating: bool) {
        self.timers.insert(
            id,
            TimerEntry {
                host,
                handler,
                repeating,
            },
        );
    }

    pub fn insert_frame(&mut self, id: u32, host: HostHandle, handler: FrameHandler) {
        self.frames.insert(id, FrameEntry { host, handler });
    }

    /// Handler to run for timer `id`; one-shot entries leave the table here
    pub fn take_due_timer(&mut self, id: u32) -> Option<TimerHandler> {
        let repeating = self.timers.get(&id)?.repeating;
        if repeating {
            self.timers.get(&id).map(|entry| entry.handler.clone())
        } else {
            self.timers.remove(&id).map(|entry| entry.handler)
        }
    }

    /// Frames are one-shot: the entry always leaves the table
    pub fn take_due_frame(&mut self, id: u32) -> Option<FrameHandler> {
        self.frames.remove(&id).map(|entry| entry.handler)
    }

    /// Remove a timer; frame ids are left alone
    pub fn remove_timer(&mut self, id: u32) -> Option<HostHandle> {
        self.timers.remove(&id).map(|entry| entry.host)
    }

    /// Remove a frame; timer ids are left alone
    pub fn remove_frame(&mut self, id: u32) -> Option<HostHandle> {
        self.frames.remove(&id).map(|entry| entry.host)
    }

    /// Empty both tables and reset the counter
    pub fn drain(&mut self) -> Vec<HostHandle> {
        self.next_id = 0;
        self.timers
            .drain()
            .map(|(_, entry)| entry.host)
            .chain(self.frames.drain().map(|(_, entry)| entry.host))
            .collect()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty() && self.frames.is_empty()
    }
}
