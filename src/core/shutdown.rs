//! # Termination signal sources.
//!
//! [`Signals`] completes when the process should terminate. Two sources exist:
//! - **OS signals** (default), registered eagerly by [`Signals::os`];
//! - **custom future** supplied through
//!   [`ApplicationBuilder::with_shutdown_signal`](crate::ApplicationBuilder::with_shutdown_signal).
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use futures::future::BoxFuture;

/// Registered termination signal source.
pub(crate) enum Signals {
    #[cfg(unix)]
    Os {
        sigint: tokio::signal::unix::Signal,
        sigterm: tokio::signal::unix::Signal,
        sigquit: tokio::signal::unix::Signal,
    },
    #[cfg(not(unix))]
    Os,
    Custom(BoxFuture<'static, ()>),
}

impl Signals {
    /// Registers OS signal listeners.
    ///
    /// Returns `Err` if signal registration fails.
    #[cfg(unix)]
    pub(crate) fn os() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Signals::Os {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Registers OS signal listeners.
    #[cfg(not(unix))]
    pub(crate) fn os() -> std::io::Result<Self> {
        Ok(Signals::Os)
    }

    /// Waits for the next termination signal.
    pub(crate) async fn recv(self) {
        match self {
            #[cfg(unix)]
            Signals::Os {
                mut sigint,
                mut sigterm,
                mut sigquit,
            } => {
                tokio::select! {
                    _ = sigint.recv()  => {},
                    _ = sigterm.recv() => {},
                    _ = sigquit.recv() => {},
                }
            }
            #[cfg(not(unix))]
            Signals::Os => {
                let _ = tokio::signal::ctrl_c().await;
            }
            Signals::Custom(fut) => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_custom_source_completes_with_its_future() {
        let (tx, rx) = oneshot::channel::<()>();
        let signals = Signals::Custom(
            async move {
                let _ = rx.await;
            }
            .boxed(),
        );
        let waiter = tokio::spawn(signals.recv());
        tx.send(()).unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_os_registration_succeeds() {
        assert!(Signals::os().is_ok());
    }
}
