//! # Lifecycle events emitted by the scheduler and tasks.
//!
//! [`EventKind`] classifies everything that happens to a task between being
//! added and being removed, plus scheduler-level warnings. [`Event`] carries
//! the metadata: task name, stage, exit code, PID, captured output.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so subscribers can restore exact order.
//!
//! ## Example
//! ```rust
//! use stagexec::{Event, EventKind, Stage};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("importer")
//!     .with_stage(Stage::Check)
//!     .with_code(2);
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("importer"));
//! assert_eq!(ev.code, Some(2));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::stage::Stage;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler and task lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Descriptor events ===
    /// An unknown key in a raw task config was ignored.
    ///
    /// Sets: `task` (if a label was present), `reason` (the ignored key).
    OptionIgnored,

    /// A validated task was added to the live collection.
    ///
    /// Sets: `task`, `stage` (start stage).
    TaskAdded,

    // === Task lifecycle events ===
    /// A task's process was launched.
    ///
    /// Sets: `task`, `stage`, `pid` (when the OS reports one).
    TaskLaunched,

    /// The scheduler is sleep-polling a blocking task.
    ///
    /// Sets: `task`, `stage`.
    BlockingWait,

    /// A task's process exited with code zero.
    ///
    /// Sets: `task`, `code` (always 0).
    TaskFinished,

    /// A task's process exited non-zero (recoverable unless stop-on-fail).
    ///
    /// Sets: `task`, `code`.
    TaskFailed,

    /// An unfinished task was forcibly terminated at its stop stage.
    ///
    /// Sets: `task`, `stage`.
    TaskTerminated,

    /// A task was removed from the live collection at its stop stage.
    ///
    /// Sets: `task`, `stage`.
    TaskRemoved,

    // === Captured output (published once, at task shutdown) ===
    /// Full captured stdout of a task, if non-empty. Diagnostic level.
    ///
    /// Sets: `task`, `reason` (the content).
    StdoutCaptured,

    /// Full captured stderr of a task, if non-empty. Error level.
    ///
    /// Sets: `task`, `reason` (the content).
    StderrCaptured,

    // === Run-level events ===
    /// A stop-on-fail task failed; the whole run is aborting.
    ///
    /// Sets: `task`, `code`.
    RunAborted,

    /// Tasks were still live after the post-process stage (stop stage earlier
    /// than start stage, or never reached). Warning, not fatal.
    ///
    /// Sets: `reason` (names of the leftover tasks).
    TasksLeftOver,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Stage being processed when the event was published.
    pub stage: Option<Stage>,
    /// Observed exit code.
    pub code: Option<i32>,
    /// OS process id of the launched task.
    pub pid: Option<u32>,
    /// Free-form payload: ignored key, captured output, leftover task names.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            stage: None,
            code: None,
            pid: None,
            reason: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the stage being processed.
    #[inline]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a free-form payload.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
