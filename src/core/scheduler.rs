//! # Scheduler: drives tasks through host lifecycle stages.
//!
//! The [`Scheduler`] owns the ordered live-task collection and the event bus.
//! The host calls [`process_stage`](Scheduler::process_stage) once per
//! lifecycle stage, in the host's own fixed order; each call runs three
//! sub-phases over the collection:
//!
//! ```text
//! process_stage(stage)
//!   ├─► start phase       launch every task with start-stage == stage
//!   │                     (launch failure aborts the stage call)
//!   ├─► block-wait phase  sleep-poll every blocking task of this stage
//!   │                     until Finished (stop-on-fail ─► RunError::Abort,
//!   │                     remaining blocking tasks are not awaited)
//!   └─► stop phase        terminate + remove every task with
//!                         stop-stage == stage (select-then-remove)
//! ```
//!
//! ## Rules
//! - Phase boundaries are strict: all launches complete before any wait, all
//!   waits before any removal.
//! - Within a phase, tasks are processed in configuration order.
//! - A task is never re-added once removed.
//! - After the stop phase of `post-process`, tasks still live are reported as
//!   a lifecycle anomaly (warning event, not an error).
//!
//! ## Example
//! ```no_run
//! use stagexec::{Scheduler, SchedulerConfig, Stage, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sched = Scheduler::new(SchedulerConfig::default(), Vec::new());
//!     sched.add_task(
//!         TaskSpec::new("echo hi", Stage::Prepare)
//!             .with_stop(Stage::Prepare)
//!             .with_block(true),
//!     )?;
//!
//!     for stage in Stage::ALL {
//!         if let Err(e) = sched.process_stage(stage).await {
//!             if e.is_abort() {
//!                 // halt the whole run immediately
//!                 break;
//!             }
//!             return Err(e.into());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::time;

use crate::core::config::SchedulerConfig;
use crate::error::{ConfigError, RunError};
use crate::events::{Bus, Event, EventKind};
use crate::stage::Stage;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{Task, TaskSpec};

/// Stage-gated supervisor for external shell tasks.
///
/// Owns the ordered live-task collection for the lifetime of the host run.
/// All mutation happens on the single control thread that drives stages; the
/// host must call stage transitions sequentially, never concurrently.
pub struct Scheduler {
    cfg: SchedulerConfig,
    bus: Bus,
    tasks: Vec<Task>,
}

impl Scheduler {
    /// Creates a scheduler with the given config and event subscribers.
    ///
    /// If `subscribers` is non-empty, a listener is spawned that forwards
    /// every published event to them; this requires a running tokio runtime.
    pub fn new(cfg: SchedulerConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let sched = Self {
            cfg,
            bus,
            tasks: Vec::new(),
        };
        sched.subscriber_listener(subscribers);
        sched
    }

    /// Subscribes to the event stream directly.
    ///
    /// The receiver observes events published after this call; the bus ring
    /// buffer holds up to `bus_capacity` of them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Validates a descriptor and adds it to the live collection.
    ///
    /// Preparation aborts on the first invalid descriptor; the bad task is
    /// never added.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<(), ConfigError> {
        spec.validate()?;
        let task = Task::new(spec, &self.cfg.workdir, self.bus.clone());
        self.bus.publish(
            Event::new(EventKind::TaskAdded)
                .with_task(task.name())
                .with_stage(task.spec().start()),
        );
        self.tasks.push(task);
        Ok(())
    }

    /// Builds a descriptor from a raw config map and adds it.
    ///
    /// The start stage is stamped by the caller, matching per-stage task
    /// declarations in host config. Unknown keys are reported as
    /// [`EventKind::OptionIgnored`] warnings before validation, so a rejected
    /// descriptor still surfaces its ignored keys.
    pub fn add_from_config(
        &mut self,
        start: Stage,
        raw: &Map<String, Value>,
    ) -> Result<(), ConfigError> {
        let label = raw.get("label").and_then(Value::as_str);
        for key in TaskSpec::unknown_keys(raw) {
            let mut ev = Event::new(EventKind::OptionIgnored).with_reason(key);
            if let Some(label) = label {
                ev = ev.with_task(label);
            }
            self.bus.publish(ev);
        }
        let spec = TaskSpec::from_config(start, raw)?;
        self.add_task(spec)
    }

    /// Executes one lifecycle stage: start, block-wait, then stop sub-phases.
    ///
    /// Errors short-circuit: a launch failure skips the remaining phases of
    /// this stage, and [`RunError::Abort`] from a blocking task means the
    /// host must halt the entire run immediately.
    pub async fn process_stage(&mut self, stage: Stage) -> Result<(), RunError> {
        self.start_tasks(stage)?;
        self.wait_blocking_tasks(stage).await?;
        self.stop_tasks(stage).await?;

        if stage == Stage::PostProcess && !self.tasks.is_empty() {
            let names: Vec<&str> = self.tasks.iter().map(Task::name).collect();
            self.bus.publish(
                Event::new(EventKind::TasksLeftOver)
                    .with_stage(stage)
                    .with_reason(names.join(", ")),
            );
        }
        Ok(())
    }

    /// The live tasks, in configuration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Names of the live tasks, in configuration order.
    pub fn live_tasks(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::name).collect()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if no tasks remain in the live collection.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Start phase: launch every task of this stage, in configuration order.
    fn start_tasks(&mut self, stage: Stage) -> Result<(), RunError> {
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.spec().start() == stage)
        {
            task.start()?;
        }
        Ok(())
    }

    /// Block-wait phase: await every blocking task whose start stage is the
    /// current stage.
    ///
    /// Blocking tasks started at an earlier stage are deliberately not
    /// awaited here; only the stage that launched them ever waits.
    async fn wait_blocking_tasks(&mut self, stage: Stage) -> Result<(), RunError> {
        let selected: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.spec().block() && t.spec().start() == stage)
            .map(|(idx, _)| idx)
            .collect();
        for idx in selected {
            self.wait_finished(idx, stage).await?;
        }
        Ok(())
    }

    /// Awaits one task's completion with a fixed-interval sleep poll.
    ///
    /// The single seam for the waiting strategy: an event-driven wait could
    /// replace the poll loop here without touching the stage contract.
    async fn wait_finished(&mut self, idx: usize, stage: Stage) -> Result<(), RunError> {
        loop {
            if self.tasks[idx].is_finished()? {
                return Ok(());
            }
            self.bus.publish(
                Event::new(EventKind::BlockingWait)
                    .with_task(self.tasks[idx].name())
                    .with_stage(stage),
            );
            time::sleep(self.cfg.poll_interval).await;
        }
    }

    /// Stop phase: terminate and remove every task of this stage.
    ///
    /// Select-then-remove: matching indices are collected first, then each
    /// task is shut down and taken out in configuration order (the offset
    /// accounts for the earlier removals). A shutdown error — including the
    /// run-abort of a stop-on-fail task whose failure is first observed
    /// here — propagates before the removal, leaving that task live.
    async fn stop_tasks(&mut self, stage: Stage) -> Result<(), RunError> {
        let selected: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.spec().stop() == stage)
            .map(|(idx, _)| idx)
            .collect();
        for (removed, idx) in selected.into_iter().enumerate() {
            let idx = idx - removed;
            self.tasks[idx].shutdown(stage).await?;
            let task = self.tasks.remove(idx);
            self.bus.publish(
                Event::new(EventKind::TaskRemoved)
                    .with_task(task.name())
                    .with_stage(stage),
            );
        }
        Ok(())
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self, subscribers: Vec<Arc<dyn Subscribe>>) {
        if subscribers.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(subscribers);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev).await;
            }
        });
    }
}
