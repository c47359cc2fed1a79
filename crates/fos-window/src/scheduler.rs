//! Task scheduling
//!
//! Every deferred step of a window (initial load, message delivery, history
//! traversal, timers, animation frames) goes through a [`Scheduler`].
//! [`VirtualClock`] runs tasks on an explicit, deterministic clock;
//! [`SmolScheduler`] runs them in real time on a `smol` local executor.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

use smol::{LocalExecutor, Timer};

/// Shortest period of a repeating task
pub const MIN_REPEAT_PERIOD: Duration = Duration::from_millis(1);

/// Handle of a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(u64);

/// Whether a task runs once or every `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Once,
    Repeat,
}

/// Scheduled callback
pub type Task = Rc<dyn Fn()>;

/// Host task scheduler
pub trait Scheduler {
    /// Run `task` after `delay`, then every `delay` for [`Recurrence::Repeat`]
    fn schedule(&self, delay: Duration, recurrence: Recurrence, task: Task) -> HostHandle;

    /// Cancel a task; unknown handles are ignored
    fn cancel(&self, handle: HostHandle);

    /// Time elapsed since the scheduler was created
    fn now(&self) -> Duration;
}

fn repeat_period(delay: Duration) -> Duration {
    delay.max(MIN_REPEAT_PERIOD)
}

// ============================================================================
// Virtual clock
// ============================================================================

struct Scheduled {
    handle: HostHandle,
    period: Option<Duration>,
    task: Task,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_handle: u64,
    next_seq: u64,
    /// Due time, registration sequence
    queue: BTreeMap<(Duration, u64), Scheduled>,
    keys: HashMap<HostHandle, (Duration, u64)>,
}

impl ClockState {
    fn enqueue(&mut self, due: Duration, scheduled: Scheduled) {
        self.next_seq += 1;
        let key = (due, self.next_seq);
        self.keys.insert(scheduled.handle, key);
        self.queue.insert(key, scheduled);
    }

    /// Pop the first task due at or before `limit`, re-arming repeats
    fn pop_due(&mut self, limit: Option<Duration>) -> Option<Task> {
        let (&key, _) = self.queue.first_key_value()?;
        if limit.is_some_and(|limit| key.0 > limit) {
            return None;
        }
        let scheduled = self.queue.remove(&key)?;
        self.keys.remove(&scheduled.handle);
        self.now = self.now.max(key.0);

        let task = Rc::clone(&scheduled.task);
        if let Some(period) = scheduled.period {
            let due = self.now + period;
            self.enqueue(due, scheduled);
        }
        Some(task)
    }
}

/// Deterministic scheduler driven by the caller
///
/// Tasks run in due-time order; tasks due at the same time run in
/// registration order. Nothing runs until the clock is driven.
#[derive(Default)]
pub struct VirtualClock {
    state: RefCell<ClockState>,
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled tasks
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Due time of the next task
    pub fn next_due(&self) -> Option<Duration> {
        self.state.borrow().queue.keys().next().map(|&(due, _)| due)
    }

    fn run_one(&self, limit: Option<Duration>) -> bool {
        // the borrow ends before the task runs
        let task = self.state.borrow_mut().pop_due(limit);
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run the next task, moving the clock to its due time
    pub fn tick(&self) -> bool {
        self.run_one(None)
    }

    /// Move the clock forward by `by`, running everything due on the way
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.borrow().now + by;
        let mut ran = 0;
        while self.run_one(Some(target)) {
            ran += 1;
        }
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
        ran
    }

    /// Run tasks until none remain or `max_steps` have run
    pub fn run_until_idle(&self, max_steps: usize) -> usize {
        let mut ran = 0;
        while ran < max_steps && self.tick() {
            ran += 1;
        }
        if ran == max_steps && self.pending() > 0 {
            tracing::debug!(max_steps, pending = self.pending(), "Virtual clock step limit reached");
        }
        ran
    }
}

impl Scheduler for VirtualClock {
    fn schedule(&self, delay: Duration, recurrence: Recurrence, task: Task) -> HostHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = HostHandle(state.next_handle);
        let period = match recurrence {
            Recurrence::Once => None,
            Recurrence::Repeat => Some(repeat_period(delay)),
        };
        let due = state.now + delay;
        state.enqueue(
            due,
            Scheduled {
                handle,
                period,
                task,
            },
        );
        handle
    }

    fn cancel(&self, handle: HostHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(key) = state.keys.remove(&handle) {
            state.queue.remove(&key);
        }
    }

    fn now(&self) -> Duration {
        self.state.borrow().now
    }
}

// ============================================================================
// smol scheduler
// ============================================================================

/// Real-time scheduler on a single-threaded `smol` executor
///
/// Tasks only make progress while the executor is driven, e.g. through
/// [`SmolScheduler::run_for`].
pub struct SmolScheduler {
    executor: Rc<LocalExecutor<'static>>,
    start: Instant,
    next_handle: Cell<u64>,
    live: Rc<RefCell<HashMap<HostHandle, Rc<Cell<bool>>>>>,
}

impl std::fmt::Debug for SmolScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmolScheduler")
            .field("live", &self.live.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for SmolScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SmolScheduler {
    pub fn new() -> Self {
        Self {
            executor: Rc::new(LocalExecutor::new()),
            start: Instant::now(),
            next_handle: Cell::new(0),
            live: Rc::default(),
        }
    }

    /// The executor tasks are spawned on
    pub fn executor(&self) -> &LocalExecutor<'static> {
        &self.executor
    }

    /// Drive the executor for `duration` of wall time
    pub fn run_for(&self, duration: Duration) {
        smol::block_on(self.executor.run(async {
            Timer::after(duration).await;
        }));
    }

    /// Number of tasks not yet finished or cancelled
    pub fn live(&self) -> usize {
        self.live.borrow().len()
    }
}

impl Scheduler for SmolScheduler {
    fn schedule(&self, delay: Duration, recurrence: Recurrence, task: Task) -> HostHandle {
        let handle = HostHandle(self.next_handle.get() + 1);
        self.next_handle.set(handle.0);

        let cancelled = Rc::new(Cell::new(false));
        self.live.borrow_mut().insert(handle, Rc::clone(&cancelled));
        let live = Rc::downgrade(&self.live);

        self.executor
            .spawn(async move {
                let mut wait = delay;
                loop {
                    Timer::after(wait).await;
                    if cancelled.get() {
                        return;
                    }
                    task();
                    if recurrence == Recurrence::Once {
                        break;
                    }
                    wait = repeat_period(delay);
                }
                if let Some(live) = live.upgrade() {
                    live.borrow_mut().remove(&handle);
                }
            })
            .detach();
        handle
    }

    fn cancel(&self, handle: HostHandle) {
        if let Some(flag) = self.live.borrow_mut().remove(&handle) {
            flag.set(true);
        }
    }

    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move |label: &'static str| -> Task {
                let log = Rc::clone(&log);
                Rc::new(move || log.borrow_mut().push(label))
            }
        };
        (log, make)
    }

    #[test]
    fn test_virtual_order_by_due_then_registration() {
        let clock = VirtualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::from_millis(10), Recurrence::Once, task("late"));
        clock.schedule(Duration::ZERO, Recurrence::Once, task("first"));
        clock.schedule(Duration::ZERO, Recurrence::Once, task("second"));

        assert_eq!(clock.run_until_idle(100), 3);
        assert_eq!(*log.borrow(), ["first", "second", "late"]);
        assert_eq!(clock.now(), Duration::from_millis(10));
    }

    #[test]
    fn test_virtual_nothing_runs_until_driven() {
        let clock = VirtualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::ZERO, Recurrence::Once, task("a"));
        assert!(log.borrow().is_empty());
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_virtual_advance_stops_at_target() {
        let clock = VirtualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::from_millis(5), Recurrence::Once, task("a"));
        clock.schedule(Duration::from_millis(50), Recurrence::Once, task("b"));

        assert_eq!(clock.advance(Duration::from_millis(20)), 1);
        assert_eq!(clock.now(), Duration::from_millis(20));
        assert_eq!(*log.borrow(), ["a"]);
        assert_eq!(clock.next_due(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_virtual_repeat_and_cancel() {
        let clock = VirtualClock::new();
        let (log, task) = recorder();
        let handle = clock.schedule(Duration::from_millis(10), Recurrence::Repeat, task("tick"));

        clock.advance(Duration::from_millis(35));
        assert_eq!(log.borrow().len(), 3);

        clock.cancel(handle);
        clock.cancel(handle);
        clock.advance(Duration::from_millis(100));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_virtual_zero_repeat_is_bounded() {
        let clock = VirtualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::ZERO, Recurrence::Repeat, task("spin"));
        assert_eq!(clock.run_until_idle(5), 5);
        assert_eq!(log.borrow().len(), 5);
        assert_eq!(clock.now(), Duration::from_millis(4));
    }

    #[test]
    fn test_smol_runs_and_cancels() {
        let scheduler = SmolScheduler::new();
        let (log, task) = recorder();
        scheduler.schedule(Duration::from_millis(1), Recurrence::Once, task("ran"));
        let cancelled = scheduler.schedule(Duration::from_millis(1), Recurrence::Once, task("no"));
        scheduler.cancel(cancelled);

        scheduler.run_for(Duration::from_millis(50));
        assert_eq!(*log.borrow(), ["ran"]);
        assert_eq!(scheduler.live(), 0);
    }
}
