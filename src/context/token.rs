//! # Cancellation context handed to services, resources and the main task.
//!
//! [`Context`] bundles three things:
//! - a **done signal** ([`CancellationToken`] underneath);
//! - an optional **deadline** (inherited by derived contexts, earliest wins);
//! - a queryable **error** explaining why the context is done.
//!
//! ## Derivation
//! ```text
//! Context::background()            Application::context()
//!        │                                │ (scope: done token + recorded error)
//!        ├─► child()                      ├─► child()          error: parent's error when parent is done
//!        └─► with_timeout(d)              └─► with_timeout(d)  error: DeadlineExceeded once d elapsed
//! ```
//!
//! ## Rules
//! - Cancelling a context cancels every context derived from it, never its parent.
//! - Deadlines are checked lazily: no timer task is spawned; [`Context::done`] races the
//!   token against `sleep_until(deadline)`.
//! - [`Context::error`] is `None` while the context is live.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::context::slot::ErrorSlot;
use crate::error::AppError;

#[derive(Clone, Debug)]
enum Origin {
    /// Root context with no error source.
    Background,
    /// Root context of a supervisor: done token plus its recorded first error.
    Scope(Arc<ErrorSlot>),
    /// Derived from another context.
    Derived(Arc<Context>),
}

#[derive(Clone, Copy, Debug)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Cancellation context with done-signal, optional deadline and error query.
///
/// Cheap to clone; clones share the same signal.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use appvisor::{AppError, Context};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let root = Context::background();
/// let child = root.child();
/// root.cancel();
/// child.done().await;
/// assert_eq!(child.error(), Some(AppError::Canceled));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Deadline>,
    origin: Origin,
}

impl Context {
    /// Creates an empty root context: never done unless cancelled, no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            origin: Origin::Background,
        }
    }

    /// Root context of a supervisor: done when `token` fires, error from `slot`.
    pub(crate) fn scoped(token: CancellationToken, slot: Arc<ErrorSlot>) -> Self {
        Self {
            token,
            deadline: None,
            origin: Origin::Scope(slot),
        }
    }

    /// Derives a cancellable child context. Inherits the parent's deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            origin: Origin::Derived(Arc::new(self.clone())),
        }
    }

    /// Derives a child context that is done at most `timeout` from now.
    ///
    /// An earlier inherited deadline is kept. A timeout too large to represent as an
    /// instant adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut ctx = self.child();
        let Some(at) = Instant::now().checked_add(timeout) else {
            return ctx;
        };
        ctx.deadline = match self.deadline {
            Some(parent) if parent.at <= at => Some(parent),
            _ => Some(Deadline { at, timeout }),
        };
        ctx
    }

    /// Cancels this context and every context derived from it.
    ///
    /// No-op on the supervisor scope itself: only the application finishes it.
    pub fn cancel(&self) {
        if !matches!(self.origin, Origin::Scope(_)) {
            self.token.cancel();
        }
    }

    /// Completes once the context is cancelled or its deadline elapsed.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(deadline.at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Non-blocking check of [`Context::done`].
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline_elapsed()
    }

    /// Deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// Explains why the context is done.
    ///
    /// - supervisor scope: the first recorded error, or [`AppError::Shutdown`] once done;
    /// - deadline elapsed: [`AppError::DeadlineExceeded`];
    /// - derived: the parent's error when the parent is done, otherwise [`AppError::Canceled`];
    /// - background: [`AppError::Canceled`].
    pub fn error(&self) -> Option<AppError> {
        if self.token.is_cancelled() {
            return Some(match &self.origin {
                Origin::Background => AppError::Canceled,
                Origin::Scope(slot) => slot.get().unwrap_or(AppError::Shutdown),
                Origin::Derived(parent) if parent.is_done() => {
                    parent.error().unwrap_or(AppError::Canceled)
                }
                Origin::Derived(_) => AppError::Canceled,
            });
        }
        match self.deadline {
            Some(deadline) if self.deadline_elapsed() => Some(AppError::DeadlineExceeded {
                timeout: deadline.timeout,
            }),
            _ => None,
        }
    }

    fn deadline_elapsed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d.at)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
