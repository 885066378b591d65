//! # Fan-out/fan-in runner.
//!
//! [`ParallelRun`] runs operations concurrently against one shared [`Context`] and collects
//! every failure into an [`AggregateError`].
//!
//! ## Architecture
//! ```text
//! spawn(op1) ──► tokio::spawn(op1(ctx)) ──┐
//! spawn(op2) ──► tokio::spawn(op2(ctx)) ──┼──► join(): FuturesUnordered over JoinHandles
//! spawn(opN) ──► tokio::spawn(opN(ctx)) ──┘         ├─ Ok(Ok)   → nothing
//!                                                   ├─ Ok(Err)  → push error
//!                                                   └─ Err(panic) → push "unhandled error: .."
//! ```
//!
//! ## Rules
//! - A panicking operation never takes the caller down: the panic surfaces through its
//!   `JoinHandle` and becomes an [`AppError::Unhandled`] entry.
//! - Errors are collected in completion order.
//! - `spawn` takes `&self`: submissions may come from several places before `join()`.
//! - Dropping an unfinished `join()` future detaches the operations still running.

use std::any::Any;
use std::future::Future;
use std::sync::Mutex;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::task::{JoinError, JoinHandle};

use crate::context::Context;
use crate::error::{AggregateError, AppError};

/// Concurrent runner with panic recovery and error aggregation.
///
/// # Example
/// ```
/// use appvisor::{AppError, Context, ParallelRun};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let p = ParallelRun::new(Context::background());
/// p.spawn(|_ctx| async { Ok(()) });
/// p.spawn(|_ctx| async { Err(AppError::fail("db down")) });
///
/// let err = p.join().await.unwrap_err();
/// assert_eq!(err.len(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct ParallelRun {
    ctx: Context,
    handles: Mutex<Vec<JoinHandle<Result<(), AppError>>>>,
}

impl ParallelRun {
    /// Creates a runner whose operations all receive a clone of `ctx`.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Shared context handed to every operation.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Schedules `op(ctx)` on the Tokio runtime.
    ///
    /// `op` itself is invoked inside the spawned task, so a panic while building the future is
    /// captured as well.
    pub fn spawn<F, Fut>(&self, op: F)
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        let handle = tokio::spawn(async move { op(ctx).await });
        self.handles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(handle);
    }

    /// Waits for every submitted operation.
    ///
    /// Returns `Ok(())` if all succeeded, otherwise an aggregate with one entry per failure.
    pub async fn join(self) -> Result<(), AggregateError> {
        let handles = self.handles.into_inner().unwrap_or_else(|p| p.into_inner());
        let mut pending: FuturesUnordered<_> = handles.into_iter().collect();
        let mut errors = AggregateError::default();

        while let Some(res) = pending.next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(join_err) => errors.push(join_failure(join_err)),
            }
        }
        errors.into_result()
    }
}

/// Converts an aborted task into a regular failure.
pub(crate) fn join_failure(err: JoinError) -> AppError {
    if err.is_panic() {
        AppError::Unhandled {
            error: panic_message(&*err.into_panic()),
        }
    } else {
        AppError::Canceled
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_succeed_returns_ok() {
        let p = ParallelRun::new(Context::background());
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = counter.clone();
            p.spawn(move |_ctx| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert!(p.join().await.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_counted() {
        let p = ParallelRun::new(Context::background());
        for i in 0..9 {
            p.spawn(move |_ctx| async move {
                match i % 3 {
                    0 => Ok(()),
                    1 => Err(AppError::fail(format!("op {i} failed"))),
                    _ => panic!("op {i} panicked"),
                }
            });
        }

        let err = p.join().await.unwrap_err();
        assert_eq!(err.len(), 6);
        let unhandled = err
            .errors()
            .iter()
            .filter(|e| matches!(e, AppError::Unhandled { .. }))
            .count();
        assert_eq!(unhandled, 3);
        assert!(err.to_string().contains("op 1 failed"));
        assert!(err.to_string().contains("unhandled error: op 2 panicked"));
    }

    #[tokio::test]
    async fn test_panic_while_building_future_is_captured() {
        let p = ParallelRun::new(Context::background());
        p.spawn(|_ctx| -> futures::future::Ready<Result<(), AppError>> {
            panic!("eager")
        });
        let err = p.join().await.unwrap_err();
        assert_eq!(
            err.errors(),
            &[AppError::Unhandled {
                error: "eager".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_operations_share_the_context() {
        let p = ParallelRun::new(Context::background());
        let ctx = p.context().clone();
        p.spawn(|ctx| async move {
            ctx.done().await;
            Err(ctx.error().unwrap_or(AppError::WrongState))
        });
        p.spawn(|ctx| async move {
            ctx.cancel();
            Ok(())
        });

        let err = p.join().await.unwrap_err();
        assert!(ctx.is_done());
        assert_eq!(err.errors(), &[AppError::Canceled]);
    }

    #[tokio::test]
    async fn test_empty_join_is_ok() {
        assert!(ParallelRun::new(Context::background()).join().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_not_sequential() {
        let p = ParallelRun::new(Context::background());
        for _ in 0..5 {
            p.spawn(|_ctx| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            });
        }
        let started = tokio::time::Instant::now();
        p.join().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
