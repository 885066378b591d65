//! # LogWriter: lifecycle events as `tracing` records.
//!
//! A subscriber that renders every [`Event`] through `tracing` under the `appvisor` target.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output
//! ```text
//! INFO appvisor: starting application
//! INFO appvisor: resources ready init_timeout_ms=15000
//! INFO appvisor: termination signal received
//! INFO appvisor: halting application
//! WARN appvisor: main task ignored halt timeout_ms=1000
//! INFO appvisor: shutting down application
//! INFO appvisor: application stopped
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref();
        let source = e.source.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::AppStarting => info!(target: "appvisor", seq = e.seq, "starting application"),
            EventKind::ResourcesReady => {
                info!(target: "appvisor", init_timeout_ms = e.timeout_ms, "resources ready")
            }
            EventKind::ResourcesFailed => {
                error!(target: "appvisor", reason, "resource initialization failed")
            }
            EventKind::WatcherStarted => info!(target: "appvisor", "starting resource watcher"),
            EventKind::WatcherExited => match reason {
                Some(reason) => warn!(target: "appvisor", reason, "resource watcher failed"),
                None => info!(target: "appvisor", "resource watcher stopped"),
            },
            EventKind::MainExited => match reason {
                Some(reason) => warn!(target: "appvisor", main = source, reason, "main task failed"),
                None => info!(target: "appvisor", main = source, "main task finished"),
            },
            EventKind::SignalReceived => info!(target: "appvisor", "termination signal received"),
            EventKind::HaltRequested => info!(target: "appvisor", "halting application"),
            EventKind::ShutdownRequested => info!(target: "appvisor", "shutting down application"),
            EventKind::TerminationTimeout => {
                warn!(target: "appvisor", timeout_ms = e.timeout_ms, "main task ignored halt")
            }
            EventKind::ResourcesReleased => match reason {
                Some(reason) => warn!(target: "appvisor", reason, "resource release failed"),
                None => info!(target: "appvisor", "resources released"),
            },
            EventKind::AppStopped => match reason {
                Some(reason) => error!(target: "appvisor", reason, "application stopped with error"),
                None => info!(target: "appvisor", "application stopped"),
            },
            EventKind::SubscriberOverflow => {
                warn!(target: "appvisor", subscriber = source, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(target: "appvisor", subscriber = source, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
