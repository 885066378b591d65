//! # Function-backed main task (`MainFn`)
//!
//! [`MainFn`] wraps a closure `F: Fn(Context, HaltSignal) -> Fut`, producing a fresh future per
//! spawn. If shared state is needed, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use appvisor::{AppError, Context, HaltSignal, MainFn, MainRef};
//!
//! let main: MainRef = MainFn::arc("server", |_ctx: Context, halt: HaltSignal| async move {
//!     halt.halted().await;
//!     Ok::<_, AppError>(())
//! });
//!
//! assert_eq!(main.name(), "server");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::context::{Context, HaltSignal};
use crate::error::AppError;
use crate::tasks::task::{BoxMainFuture, MainTask};

/// Function-backed main task.
#[derive(Debug)]
pub struct MainFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> MainFn<F>
where
    F: Fn(Context, HaltSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    /// Creates a new function-backed main task.
    ///
    /// Prefer [`MainFn::arc`] when you immediately need a [`MainRef`](crate::MainRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> MainTask for MainFn<F>
where
    F: Fn(Context, HaltSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: Context, halt: HaltSignal) -> BoxMainFuture {
        Box::pin((self.f)(ctx, halt))
    }
}
