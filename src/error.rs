//! Error types used by the scheduler and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`ConfigError`] — raised while building a task descriptor; fatal to the
//!   preparation step.
//! - [`RunError`] — raised while launching, polling, or stopping tasks.
//!
//! [`RunError::Abort`] is the distinct run-abort signal: it means "halt the
//! entire host run now", not "this one task failed". Every layer must check
//! [`RunError::is_abort`] and propagate it without swallowing.

use std::io;

use thiserror::Error;

/// # Errors raised during task descriptor construction.
///
/// Each variant carries a human-readable cause. The scheduler surfaces the
/// first such error and aborts preparation rather than skipping the bad task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A stage name outside the fixed stage set.
    #[error("unknown stage name {stage:?} in task config")]
    UnknownStage {
        /// The offending stage string.
        stage: String,
    },

    /// The descriptor has no command string (or an empty one).
    #[error("no command in task config")]
    MissingCommand,

    /// A flag field (`block`, `stop-on-fail`) holds a non-boolean value.
    #[error("option {key:?} must be a boolean, got {value}")]
    NotABoolean {
        /// The config key in question.
        key: &'static str,
        /// The raw value, rendered for the message.
        value: String,
    },

    /// A string field (`command`, `label`, `out`, `err`, `stop-stage`) holds
    /// a non-string value.
    #[error("option {key:?} must be a string")]
    NotAString {
        /// The config key in question.
        key: &'static str,
    },

    /// `block = true` combined with `start-stage = startup`; the host cannot
    /// pause there.
    #[error("blocking tasks are not allowed on the startup stage")]
    BlockingOnStartup,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use stagexec::ConfigError;
    ///
    /// assert_eq!(ConfigError::MissingCommand.as_label(), "config_missing_command");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::UnknownStage { .. } => "config_unknown_stage",
            ConfigError::MissingCommand => "config_missing_command",
            ConfigError::NotABoolean { .. } => "config_not_a_boolean",
            ConfigError::NotAString { .. } => "config_not_a_string",
            ConfigError::BlockingOnStartup => "config_blocking_on_startup",
        }
    }
}

/// # Errors raised while supervising tasks.
///
/// `Launch` and `Io` abort the current stage call; `Abort` aborts the whole
/// host run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The task's process could not be spawned.
    #[error("task {task:?} failed to launch: {source}")]
    Launch {
        /// Name of the task that failed to start.
        task: String,
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// A stop-on-fail task exited non-zero; the entire run must halt.
    #[error("task {task:?} exited with code {code} and stop-on-fail is set; aborting run")]
    Abort {
        /// Name of the failed task.
        task: String,
        /// The observed exit code.
        code: i32,
    },

    /// Filesystem or polling I/O failure while handling a task.
    #[error("i/o error while supervising task {task:?}: {source}")]
    Io {
        /// Name of the task being handled.
        task: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use stagexec::RunError;
    ///
    /// let abort = RunError::Abort { task: "guard".into(), code: 1 };
    /// assert_eq!(abort.as_label(), "run_aborted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Launch { .. } => "run_launch_failed",
            RunError::Abort { .. } => "run_aborted",
            RunError::Io { .. } => "run_io_failed",
        }
    }

    /// True only for the run-abort signal.
    ///
    /// Hosts use this to distinguish "halt the whole run immediately" from a
    /// stage-local failure.
    ///
    /// # Example
    /// ```
    /// use stagexec::RunError;
    ///
    /// let abort = RunError::Abort { task: "guard".into(), code: 1 };
    /// assert!(abort.is_abort());
    ///
    /// let launch = RunError::Launch {
    ///     task: "guard".into(),
    ///     source: std::io::Error::other("spawn failed"),
    /// };
    /// assert!(!launch.is_abort());
    /// ```
    pub fn is_abort(&self) -> bool {
        matches!(self, RunError::Abort { .. })
    }
}
