//! # SubscriberSet: fan-out over multiple subscribers.
//!
//! Distributes each [`Event`] to every subscriber in turn. The scheduler is a
//! single control thread and publishes at human-scale rates (launches, polls,
//! removals), so delivery is sequential; there are no per-subscriber queues.
//!
//! ## What it guarantees
//! - Per-set FIFO: subscribers see events in publish order.
//! - Panic isolation: a panicking subscriber is reported and skipped; the
//!   others still receive the event.

use std::sync::Arc;

use futures::FutureExt;

use crate::events::Event;

use super::Subscribe;

/// Sequential fan-out over a fixed set of subscribers.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set from the given subscribers.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs }
    }

    /// Delivers one event to all subscribers, in order.
    ///
    /// Panics inside `on_event` are caught and reported to stderr with the
    /// subscriber's name.
    pub async fn emit(&self, event: &Event) {
        for sub in &self.subs {
            let fut = sub.on_event(event);
            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                eprintln!(
                    "[stagexec] subscriber '{}' panicked: {:?}",
                    sub.name(),
                    panic_err
                );
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}
