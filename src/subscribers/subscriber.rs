//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging custom event handlers
//! (logging, auditing, test assertions) into the scheduler.
//!
//! ## Rules
//! - Events are delivered sequentially, in `seq` order.
//! - Panics inside a subscriber are caught and reported; they never take the
//!   scheduler down (see [`SubscriberSet`](super::SubscriberSet)).

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for run observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in panic reports.
    ///
    /// Prefer short, descriptive names (e.g., "log", "audit"). The default
    /// uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
