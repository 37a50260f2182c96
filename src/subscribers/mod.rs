//! # Event subscribers.
//!
//! The [`Subscribe`] trait is the observability seam: the scheduler publishes
//! lifecycle events to a bus and a listener fans them out to every subscriber
//! through a [`SubscriberSet`].

mod set;
mod subscriber;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
