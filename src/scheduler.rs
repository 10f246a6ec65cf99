//! Cooperative task scheduler.
//!
//! Four task slots share one thread.  Each call to [`TaskScheduler::tick`]
//! checks the slots in fixed priority order and runs the ones that are due
//! through a [`TaskDelegate`]:
//!
//! ```text
//!   tick(now)
//!     │
//!     ├─ 1. sense        (if due)            ─▶ delegate.run_sense
//!     ├─ 2. infer        (if due && valid)   ─▶ delegate.run_infer
//!     ├─ 3. sync         (if due)            ─▶ delegate.run_sync
//!     └─ 4. power check  (if due)            ─▶ delegate.run_power_check
//!                                                 │
//!                      new IntervalSet ◀──────────┘
//! ```
//!
//! A slot is due when `now - last_run >= interval`; running it sets
//! `last_run = now`.  Nothing preempts a running task, so a slow task
//! delays the rest of the tick.  Interval changes from the power check take
//! effect on the next due-check, and a slot never fires more than once per
//! tick to catch up.

use core::fmt;

use log::debug;

use crate::app::ports::TaskDelegate;
use crate::power::IntervalSet;

// ═══════════════════════════════════════════════════════════════
//  Task identity
// ═══════════════════════════════════════════════════════════════

/// The four scheduled task slots, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskId {
    Sense = 0b0001,
    Infer = 0b0010,
    Sync = 0b0100,
    PowerCheck = 0b1000,
}

impl TaskId {
    /// Fixed priority order.
    pub const ORDER: [Self; 4] = [Self::Sense, Self::Infer, Self::Sync, Self::PowerCheck];

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Set of tasks that ran during one tick.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSet(u8);

impl TaskSet {
    pub fn insert(&mut self, task: TaskId) {
        self.0 |= task.mask();
    }

    pub fn contains(self, task: TaskId) -> bool {
        self.0 & task.mask() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(TaskId::ORDER.iter().filter(|t| self.contains(**t)))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule state
// ═══════════════════════════════════════════════════════════════

/// Mutable timing state, owned exclusively by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    pub last_sense_ms: u64,
    pub last_infer_ms: u64,
    pub last_sync_ms: u64,
    pub last_power_check_ms: u64,
    /// Mode-dependent sense/infer cadence.
    pub intervals: IntervalSet,
    /// Whether the most recent reading passed validation.
    pub last_reading_valid: bool,
}

impl ScheduleState {
    /// Fresh state: every slot counts from `origin_ms`.
    pub fn new(origin_ms: u64, intervals: IntervalSet) -> Self {
        Self {
            last_sense_ms: origin_ms,
            last_infer_ms: origin_ms,
            last_sync_ms: origin_ms,
            last_power_check_ms: origin_ms,
            intervals,
            last_reading_valid: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The cooperative scheduler.
///
/// Decoupled from the components it drives: when a slot is due it calls
/// the [`TaskDelegate`], which makes the scheduler testable with synthetic
/// `now` values and a recording delegate.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    state: ScheduleState,
    sync_interval_ms: u64,
    power_check_interval_ms: u64,
}

impl TaskScheduler {
    pub fn new(
        origin_ms: u64,
        intervals: IntervalSet,
        sync_interval_ms: u64,
        power_check_interval_ms: u64,
    ) -> Self {
        Self {
            state: ScheduleState::new(origin_ms, intervals),
            sync_interval_ms,
            power_check_interval_ms,
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn intervals(&self) -> IntervalSet {
        self.state.intervals
    }

    /// Replace the mode-dependent intervals.  Last-run stamps are kept.
    pub fn set_intervals(&mut self, intervals: IntervalSet) {
        self.state.intervals = intervals;
    }

    /// Replace the fixed sync / power-check cadence.
    pub fn set_fixed_intervals(&mut self, sync_interval_ms: u64, power_check_interval_ms: u64) {
        self.sync_interval_ms = sync_interval_ms;
        self.power_check_interval_ms = power_check_interval_ms;
    }

    /// Re-initialise all timing state from `origin_ms`.
    pub fn reset(&mut self, origin_ms: u64, intervals: IntervalSet) {
        self.state = ScheduleState::new(origin_ms, intervals);
    }

    /// Run every due task once, in priority order.  Returns the tasks that ran.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn TaskDelegate) -> TaskSet {
        let mut ran = TaskSet::default();

        // 1. Sense
        if due(now_ms, self.state.last_sense_ms, self.state.intervals.sense_ms) {
            self.state.last_sense_ms = now_ms;
            self.state.last_reading_valid = delegate.run_sense(now_ms);
            ran.insert(TaskId::Sense);
        }

        // 2. Infer: gated on a valid reading; the slot stays due otherwise.
        if self.state.last_reading_valid
            && due(now_ms, self.state.last_infer_ms, self.state.intervals.infer_ms)
        {
            self.state.last_infer_ms = now_ms;
            delegate.run_infer(now_ms);
            ran.insert(TaskId::Infer);
        }

        // 3. Sync
        if due(now_ms, self.state.last_sync_ms, self.sync_interval_ms) {
            self.state.last_sync_ms = now_ms;
            delegate.run_sync(now_ms);
            ran.insert(TaskId::Sync);
        }

        // 4. Power check: may retune the mode-dependent intervals.
        if due(now_ms, self.state.last_power_check_ms, self.power_check_interval_ms) {
            self.state.last_power_check_ms = now_ms;
            if let Some(intervals) = delegate.run_power_check(now_ms) {
                debug!(
                    "Scheduler: intervals sense={}ms infer={}ms",
                    intervals.sense_ms, intervals.infer_ms
                );
                self.state.intervals = intervals;
            }
            ran.insert(TaskId::PowerCheck);
        }

        ran
    }

    /// Milliseconds until the earliest slot becomes due (0 if one is due now).
    pub fn next_due_in(&self, now_ms: u64) -> u64 {
        let s = &self.state;
        [
            (s.last_sense_ms, s.intervals.sense_ms),
            (s.last_infer_ms, s.intervals.infer_ms),
            (s.last_sync_ms, self.sync_interval_ms),
            (s.last_power_check_ms, self.power_check_interval_ms),
        ]
        .iter()
        .map(|&(last, interval)| interval.saturating_sub(now_ms.saturating_sub(last)))
        .min()
        .unwrap_or(0)
    }
}

/// A clock that moves backwards yields zero elapsed time, never a huge one.
fn due(now_ms: u64, last_ms: u64, interval_ms: u64) -> bool {
    now_ms.saturating_sub(last_ms) >= interval_ms
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
