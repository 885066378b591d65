//! # Lifecycle events emitted by the application supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Run events**: start, resource readiness, main task exit, final stop
//! - **Termination events**: signal, halt, shutdown, termination timeout
//! - **Subscriber events**: overflow and panic of event subscribers
//!
//! The [`Event`] struct carries metadata such as timestamps, a source name, a reason
//! and a timeout.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TerminationTimeout)
//!     .with_source("server")
//!     .with_timeout(Duration::from_secs(1));
//!
//! assert_eq!(ev.kind, EventKind::TerminationTimeout);
//! assert_eq!(ev.source.as_deref(), Some("server"));
//! assert_eq!(ev.timeout_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `source` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `source` (subscriber name), `reason` ("full" / "closed")
    SubscriberOverflow,

    // === Run events ===
    /// `run()` accepted the call and is about to initialize resources.
    AppStarting,

    /// Resources initialized successfully.
    ///
    /// Sets: `timeout_ms` (initialization timeout)
    ResourcesReady,

    /// Resource initialization failed; the run aborts.
    ///
    /// Sets: `reason`
    ResourcesFailed,

    /// Background resource watcher started.
    WatcherStarted,

    /// Resource watcher returned; shutdown follows.
    ///
    /// Sets: `reason` (when it returned an error)
    WatcherExited,

    /// Main task returned.
    ///
    /// Sets: `source` (main task name), `reason` (when it failed)
    MainExited,

    /// Resources released.
    ///
    /// Sets: `reason` (when release failed)
    ResourcesReleased,

    /// `run()` is about to return.
    ///
    /// Sets: `reason` (the surfaced error, if any)
    AppStopped,

    // === Termination events ===
    /// Termination signal observed (OS signal or custom trigger).
    SignalReceived,

    /// Halt broadcast fired.
    HaltRequested,

    /// Done broadcast fired; the application is shutting down.
    ShutdownRequested,

    /// The main task ignored halt past the termination timeout.
    ///
    /// Sets: `timeout_ms`
    TerminationTimeout,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Related timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the emitting component (main task, subscriber), if applicable.
    pub source: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            timeout_ms: None,
            reason: None,
            source: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a source name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches the error of `res` as the reason, if any.
    #[inline]
    pub fn with_outcome<T, E: std::fmt::Display>(self, res: &Result<T, E>) -> Self {
        match res {
            Ok(_) => self,
            Err(err) => self.with_reason(err.to_string()),
        }
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    /// `true` for [`EventKind::SubscriberOverflow`] events.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::AppStarting);
        let b = Event::new(EventKind::AppStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_outcome_sets_reason_only_on_error() {
        let ok: Result<(), AppError> = Ok(());
        assert!(Event::new(EventKind::MainExited).with_outcome(&ok).reason.is_none());

        let err: Result<(), AppError> = Err(AppError::TerminationTimeout);
        let ev = Event::new(EventKind::AppStopped).with_outcome(&err);
        assert_eq!(ev.reason.as_deref(), Some("termination timeout"));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let ev = Event::new(EventKind::TerminationTimeout).with_timeout(Duration::MAX);
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
