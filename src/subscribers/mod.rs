//! # Lifecycle event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Application ── publish(Event) ──► Bus ──► event listener ──► SubscriberSet::emit(&Event)
//!                                                                  │
//!                                                         ┌────────┼─────────┐
//!                                                         ▼        ▼         ▼
//!                                                     LogWriter  Metrics   Custom
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
