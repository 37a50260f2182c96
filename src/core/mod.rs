//! Scheduler core: stage processing and run configuration.

mod config;
mod scheduler;

pub use config::SchedulerConfig;
pub use scheduler::Scheduler;
