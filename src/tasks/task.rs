//! # Task runtime: one external-process lifecycle.
//!
//! A [`Task`] owns exactly one OS process handle and two output sink paths
//! for its entire lifetime. The scheduler drives it through
//! [`start`](Task::start), [`is_finished`](Task::is_finished), and
//! [`shutdown`](Task::shutdown); the state machine is
//! `Idle → Running → Finished(code)`, with removal handled by the scheduler
//! at the task's stop stage.
//!
//! ## Rules
//! - The exit code is recorded on the first poll that observes exit.
//! - Failure reporting and the stop-on-fail escalation fire on the first
//!   poll that observes the exit — in the block-wait phase or the stop
//!   phase, whichever sees it first; later calls never re-raise.
//! - Captured output is consumed exactly once, at shutdown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::process::{Child, Command};

use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::stage::Stage;

use super::spec::TaskSpec;

/// Counter behind generated sink-name prefixes (`task-0`, `task-1`, ...).
static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Observable state of a task's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Descriptor validated, process not launched yet.
    Idle,
    /// Process launched and not yet observed to exit.
    Running,
    /// Process exit observed; the code is recorded once and kept.
    Finished(i32),
}

/// A supervised external process with captured output.
///
/// Built by the scheduler from a validated [`TaskSpec`]; the process handle
/// and sink paths are exclusively owned by this task until shutdown.
pub struct Task {
    spec: TaskSpec,
    name: String,
    state: TaskState,
    child: Option<Child>,
    stdout_path: Option<PathBuf>,
    stderr_path: Option<PathBuf>,
    workdir: PathBuf,
    bus: Bus,
}

impl Task {
    pub(crate) fn new(spec: TaskSpec, workdir: &Path, bus: Bus) -> Self {
        let name = match spec.label() {
            Some(label) => label.to_string(),
            None => format!("task-{}", TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed)),
        };
        Self {
            spec,
            name,
            state: TaskState::Idle,
            child: None,
            stdout_path: None,
            stderr_path: None,
            workdir: workdir.to_path_buf(),
            bus,
        }
    }

    /// Stable, human-readable task name: the label, or a generated prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized descriptor this task was built from.
    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    /// Current state of the task's process.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Launches the task's command as a new OS process.
    ///
    /// Resolves the output/error sink paths (`<prefix>.out` / `<prefix>.err`
    /// under the working directory unless overridden), truncates/creates both
    /// files, and spawns the command through the shell with stdout/stderr
    /// redirected into them.
    ///
    /// A launch failure is fatal and propagated to the caller.
    pub fn start(&mut self) -> Result<(), RunError> {
        let out_path = self.sink_path(self.spec.out(), "out");
        let err_path = self.sink_path(self.spec.err(), "err");

        let stdout = std::fs::File::create(&out_path).map_err(|e| self.io_error(e))?;
        let stderr = std::fs::File::create(&err_path).map_err(|e| self.io_error(e))?;

        let child = shell_command(self.spec.command())
            .current_dir(&self.workdir)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| RunError::Launch {
                task: self.name.clone(),
                source: e,
            })?;

        let mut ev = Event::new(EventKind::TaskLaunched)
            .with_task(self.name.as_str())
            .with_stage(self.spec.start());
        if let Some(pid) = child.id() {
            ev = ev.with_pid(pid);
        }
        self.bus.publish(ev);

        self.stdout_path = Some(out_path);
        self.stderr_path = Some(err_path);
        self.child = Some(child);
        self.state = TaskState::Running;
        Ok(())
    }

    /// Non-blocking check of whether the owned process has exited.
    ///
    /// On the first observed exit the code is recorded; a non-zero code with
    /// stop-on-fail set escalates to [`RunError::Abort`] instead of
    /// returning. Later calls report the recorded state without side effects.
    pub fn is_finished(&mut self) -> Result<bool, RunError> {
        if matches!(self.state, TaskState::Finished(_)) {
            return Ok(true);
        }
        let Some(code) = self.poll_exit()? else {
            return Ok(false);
        };
        if code != 0 {
            self.bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(self.name.as_str())
                    .with_code(code),
            );
            if self.spec.stop_on_fail() {
                self.bus.publish(
                    Event::new(EventKind::RunAborted)
                        .with_task(self.name.as_str())
                        .with_code(code),
                );
                return Err(RunError::Abort {
                    task: self.name.clone(),
                    code,
                });
            }
        } else {
            self.bus.publish(
                Event::new(EventKind::TaskFinished)
                    .with_task(self.name.as_str())
                    .with_code(0),
            );
        }
        Ok(true)
    }

    /// Terminates the task if needed and drains its captured output.
    ///
    /// Exit is observed through [`is_finished`](Self::is_finished), so a
    /// non-zero exit first seen here is still reported — and still escalates
    /// to [`RunError::Abort`] for a stop-on-fail task. An unfinished process
    /// is killed (single-step, no signal escalation); a finished one needs no
    /// action. Either way the sink files are then read back exactly once and
    /// published: full stdout at diagnostic level if non-empty, full stderr
    /// at error level if non-empty.
    ///
    /// A task stopped while still [`TaskState::Idle`] (its stop stage was
    /// processed before its start stage) has nothing to terminate or drain.
    pub(crate) async fn shutdown(&mut self, stage: Stage) -> Result<(), RunError> {
        if matches!(self.state, TaskState::Idle) {
            return Ok(());
        }
        if !self.is_finished()? {
            self.bus.publish(
                Event::new(EventKind::TaskTerminated)
                    .with_task(self.name.as_str())
                    .with_stage(stage),
            );
            let task = self.name.clone();
            if let Some(child) = self.child.as_mut() {
                child
                    .kill()
                    .await
                    .map_err(|source| RunError::Io { task, source })?;
            }
        }
        self.child = None;
        self.drain_output().await
    }

    /// Records the exit code if the process has exited. No events, no
    /// escalation; the abort path belongs to [`is_finished`](Self::is_finished).
    fn poll_exit(&mut self) -> Result<Option<i32>, RunError> {
        if let TaskState::Finished(code) = self.state {
            return Ok(Some(code));
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        match child.try_wait() {
            Ok(None) => Ok(None),
            Ok(Some(status)) => {
                // A signal-terminated child reports no code; treat as failure.
                let code = status.code().unwrap_or(-1);
                self.state = TaskState::Finished(code);
                Ok(Some(code))
            }
            Err(e) => Err(RunError::Io {
                task: self.name.clone(),
                source: e,
            }),
        }
    }

    /// Reads both sink files back and publishes their content.
    ///
    /// Bytes are decoded lossily: a task that wrote non-UTF-8 output still
    /// gets a (degraded) diagnostic dump instead of failing its shutdown.
    async fn drain_output(&mut self) -> Result<(), RunError> {
        if let Some(path) = &self.stdout_path {
            let out = tokio::fs::read(path).await.map_err(|e| self.io_error(e))?;
            if !out.is_empty() {
                self.bus.publish(
                    Event::new(EventKind::StdoutCaptured)
                        .with_task(self.name.as_str())
                        .with_reason(String::from_utf8_lossy(&out).into_owned()),
                );
            }
        }
        if let Some(path) = &self.stderr_path {
            let err = tokio::fs::read(path).await.map_err(|e| self.io_error(e))?;
            if !err.is_empty() {
                self.bus.publish(
                    Event::new(EventKind::StderrCaptured)
                        .with_task(self.name.as_str())
                        .with_reason(String::from_utf8_lossy(&err).into_owned()),
                );
            }
        }
        Ok(())
    }

    fn sink_path(&self, explicit: Option<&str>, extension: &str) -> PathBuf {
        match explicit {
            Some(path) => self.workdir.join(path),
            None => self.workdir.join(format!("{}.{extension}", self.name)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> RunError {
        RunError::Io {
            task: self.name.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("command", &self.spec.command())
            .finish()
    }
}

/// Builds a command that runs `raw` through the platform shell, matching the
/// "command string, shell interpretation" launch contract.
#[cfg(unix)]
fn shell_command(raw: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(raw);
    cmd
}

#[cfg(windows)]
fn shell_command(raw: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(raw);
    cmd
}
