//! # Resources capability.
//!
//! [`Resources`] is everything the [`Application`](crate::Application) needs from its auxiliary
//! dependencies, in call order:
//!
//! ```text
//! init(ctx) ──► watch(ctx) (background, until stop or failure) ──► stop() ──► release()
//! ```
//!
//! [`ServiceKeeper`](crate::ServiceKeeper) is the canonical implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::AppError;

/// Shared handle to a resources implementation.
pub type ResourcesRef = Arc<dyn Resources>;

/// # Auxiliary dependencies of an application.
#[async_trait]
pub trait Resources: Send + Sync + 'static {
    /// Initializes every resource. `ctx` carries the initialization deadline.
    async fn init(&self, ctx: Context) -> Result<(), AppError>;

    /// Watches resource health until [`Resources::stop`] is called, `ctx` is done, or a resource
    /// fails. A returned error (or `Ok`) triggers application shutdown.
    async fn watch(&self, ctx: Context) -> Result<(), AppError>;

    /// Asks [`Resources::watch`] to return. Idempotent.
    fn stop(&self);

    /// Releases every resource. Must be bounded in time.
    async fn release(&self) -> Result<(), AppError>;
}
