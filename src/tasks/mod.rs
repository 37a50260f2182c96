//! # Task descriptors and runtime.
//!
//! - [`TaskSpec`] — the immutable, normalized descriptor of one shell task.
//! - [`Task`] — the runtime side: one OS process handle, two output sinks,
//!   and the `Idle → Running → Finished` state machine.

mod spec;
mod task;

pub use spec::{TaskSpec, KNOWN_KEYS};
pub use task::{Task, TaskState};
