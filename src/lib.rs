//! # stagexec
//!
//! **stagexec** is a stage-gated shell task supervisor for Rust.
//!
//! Given a declarative list of shell tasks bound to named lifecycle stages of
//! a host application, it launches, monitors, blocks on, and terminates each
//! task at the correct stage boundary, captures its output into files, and
//! propagates fatal failures into a process-wide abort signal.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskSpec   │   │   TaskSpec   │   │   TaskSpec   │
//!     │ (descriptor) │   │ (descriptor) │   │ (descriptor) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Scheduler (one per host run)                                 │
//! │  - ordered live-task collection (configuration order)         │
//! │  - process_stage(stage): start ─► block-wait ─► stop          │
//! │  - Bus (broadcast events) + SubscriberSet fan-out             │
//! └──────┬──────────────────┬──────────────────┬──────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Task     │   │     Task     │   │     Task     │
//!     │ sh -c <cmd>  │   │ sh -c <cmd>  │   │ sh -c <cmd>  │
//!     │ > x.out      │   │ > y.out      │   │ > z.out      │
//!     │ 2> x.err     │   │ 2> y.err     │   │ 2> z.err     │
//!     └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ### Stage lifecycle
//! The stage set is closed and host-driven: `prepare`, `startup`, `check`,
//! `post-process`, `shutdown`. The host calls
//! [`Scheduler::process_stage`] once per stage in its own fixed order;
//! concurrency comes only from the OS processes themselves — the scheduler
//! is a single cooperative control thread that suspends only while
//! sleep-polling blocking tasks.
//!
//! ### Failure model
//! | Failure | Effect |
//! |---|---|
//! | Invalid descriptor | [`ConfigError`]; preparation aborts on the first one |
//! | Launch failure | [`RunError::Launch`]; the stage call aborts |
//! | Non-zero exit | logged, task is `Finished` — recoverable |
//! | Non-zero exit with `stop-on-fail` | [`RunError::Abort`]; the whole run halts |
//! | Tasks live after `post-process` | warning event only |
//!
//! There are no retries anywhere: every failure is either logged and
//! swallowed, or escalated to a full run-abort.
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use stagexec::{Scheduler, SchedulerConfig, Stage, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SchedulerConfig::default();
//!     cfg.workdir = std::env::temp_dir();
//!
//!     let mut sched = Scheduler::new(cfg, Vec::new());
//!
//!     // A blocking one-shot at prepare, gone before the run body starts.
//!     sched.add_task(
//!         TaskSpec::new("tar czf seed.tgz data/", Stage::Prepare)
//!             .with_stop(Stage::Prepare)
//!             .with_block(true)
//!             .with_label("seed"),
//!     )?;
//!
//!     // A sidecar that lives for the whole run.
//!     sched.add_task(
//!         TaskSpec::new("python -m http.server 8000", Stage::Startup)
//!             .with_stop(Stage::Shutdown)
//!             .with_label("fileserver"),
//!     )?;
//!
//!     for stage in Stage::ALL {
//!         if let Err(e) = sched.process_stage(stage).await {
//!             if e.is_abort() {
//!                 eprintln!("run aborted: {e}");
//!                 break;
//!             }
//!             return Err(e.into());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod stage;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Scheduler, SchedulerConfig};
pub use error::{ConfigError, RunError};
pub use events::{Event, EventKind};
pub use stage::Stage;
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Task, TaskSpec, TaskState, KNOWN_KEYS};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
