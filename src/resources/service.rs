//! # Service capability.
//!
//! A [`Service`] is one externally owned dependency (a storage connection, a cache client...).
//! Its lifecycle is driven entirely by the [`ServiceKeeper`](crate::ServiceKeeper):
//!
//! ```text
//! init(ctx) ──► ping(ctx) every ping period ──► close()
//! ```
//!
//! The service owns no scheduling logic. All three operations may run concurrently with the same
//! operation of other services, so implementations only need to synchronize their own state.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::AppError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Externally owned dependency supervised by the keeper.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use appvisor::{AppError, Context, Service};
///
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     fn name(&self) -> &str { "cache" }
///
///     async fn init(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
///     async fn ping(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
///     async fn close(&self) -> Result<(), AppError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns the service name used in logs.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Brings the dependency up. Should give up once `ctx` is done.
    async fn init(&self, ctx: Context) -> Result<(), AppError>;

    /// Health check, called periodically after a successful `init`.
    async fn ping(&self, ctx: Context) -> Result<(), AppError>;

    /// Releases the dependency. May be abandoned (left running detached) past the
    /// keeper's shutdown timeout.
    async fn close(&self) -> Result<(), AppError>;
}
