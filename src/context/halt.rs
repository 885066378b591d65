//! # Read-only view of the supervisor's halt broadcast.
//!
//! The main task receives a [`HaltSignal`] next to its [`Context`](crate::Context).
//! Halt is cooperative: once it fires, the main task should wind down and return.
//! Only the supervisor can fire it.

use tokio_util::sync::CancellationToken;

/// Halt signal observed by the main task.
#[derive(Clone, Debug)]
pub struct HaltSignal {
    token: CancellationToken,
}

impl HaltSignal {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Completes once the supervisor halts.
    pub async fn halted(&self) {
        self.token.cancelled().await
    }

    /// `true` once the supervisor halted.
    pub fn is_halted(&self) -> bool {
        self.token.is_cancelled()
    }
}
