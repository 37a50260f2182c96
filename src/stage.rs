//! # Lifecycle stages of the host application run.
//!
//! Tasks are bound to members of a closed, ordered stage set. The host drives
//! the scheduler by calling [`Scheduler::process_stage`](crate::Scheduler::process_stage)
//! once per stage, in the order the host's own lifecycle dictates.
//!
//! ## Rules
//! - The set is closed: config strings that name anything else are rejected
//!   with [`ConfigError::UnknownStage`].
//! - `startup` is the one stage the host cannot pause on, so blocking tasks
//!   are not allowed there (see [`Stage::allows_blocking`]).

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A named point in the host lifecycle at which tasks are started or stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Configuration and environment setup.
    Prepare,
    /// The host is bringing its own run up; it cannot pause here.
    Startup,
    /// Periodic health/progress point during the run.
    Check,
    /// Wrap-up after the run body; default stop stage for tasks.
    PostProcess,
    /// Teardown of the host run.
    Shutdown,
}

impl Stage {
    /// All stages, in configuration order.
    pub const ALL: [Stage; 5] = [
        Stage::Prepare,
        Stage::Startup,
        Stage::Check,
        Stage::PostProcess,
        Stage::Shutdown,
    ];

    /// Default stop stage applied when a descriptor leaves `stop-stage` unset.
    pub const DEFAULT_STOP: Stage = Stage::PostProcess;

    /// Returns the canonical config-file spelling of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Startup => "startup",
            Stage::Check => "check",
            Stage::PostProcess => "post-process",
            Stage::Shutdown => "shutdown",
        }
    }

    /// Whether the scheduler is prepared to block on tasks at this stage.
    ///
    /// `startup` must not stall the host, so blocking tasks are rejected
    /// there at descriptor construction time.
    pub fn allows_blocking(&self) -> bool {
        !matches!(self, Stage::Startup)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStage {
                stage: s.to_string(),
            })
    }
}
