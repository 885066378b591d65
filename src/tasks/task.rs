//! # Main task abstraction.
//!
//! The [`MainTask`] is the process's primary workload (typically a network listener).
//! It receives the supervisor [`Context`] and a [`HaltSignal`], and must return promptly once the
//! halt signal fires. The supervisor bounds that wait with the termination timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, HaltSignal};
use crate::error::AppError;

/// Boxed future returned by [`MainTask::spawn`].
pub type BoxMainFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// Shared handle to a main task.
pub type MainRef = Arc<dyn MainTask>;

/// # Long-running primary workload.
///
/// # Example
/// ```
/// use appvisor::{AppError, BoxMainFuture, Context, HaltSignal, MainTask};
///
/// struct Listener;
///
/// impl MainTask for Listener {
///     fn name(&self) -> &str { "listener" }
///
///     fn spawn(&self, _ctx: Context, halt: HaltSignal) -> BoxMainFuture {
///         Box::pin(async move {
///             halt.halted().await;
///             Ok::<(), AppError>(())
///         })
///     }
/// }
/// ```
pub trait MainTask: Send + Sync + 'static {
    /// Returns a stable, human-readable name used in lifecycle events.
    fn name(&self) -> &str;

    /// Creates the future that runs the workload.
    ///
    /// `ctx` is done once the application shut down; `halt` fires first and is the cue to stop.
    fn spawn(&self, ctx: Context, halt: HaltSignal) -> BoxMainFuture;
}
