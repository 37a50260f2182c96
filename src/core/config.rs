//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`], the host-supplied settings for one run.
//!
//! ## Sentinel values
//! - `bus_capacity` is clamped to a minimum of 1 by the bus.

use std::path::PathBuf;
use std::time::Duration;

/// Host-supplied configuration for the stage scheduler.
///
/// ## Field semantics
/// - `workdir`: directory every task runs in and where sink files are created
/// - `poll_interval`: fixed sleep between polls of a blocking task
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
///
/// All fields are public for flexibility.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Working directory for every launched task; sink files
    /// (`<prefix>.out` / `<prefix>.err`) are created here and persist after
    /// the run.
    pub workdir: PathBuf,

    /// Fixed interval between completion polls during the block-wait phase.
    ///
    /// There is no wall-clock timeout on blocking waits; a stop-on-fail
    /// abort is the only interrupt path.
    pub poll_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `workdir = "."` (current directory)
    /// - `poll_interval = 1s` (matches the classic sleep-poll cadence)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            poll_interval: Duration::from_secs(1),
            bus_capacity: 1024,
        }
    }
}
