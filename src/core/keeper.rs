//! # ServiceKeeper: concurrent init, periodic health checks and bounded teardown.
//!
//! The keeper owns a fixed list of [`Service`]s and implements [`Resources`] for them.
//!
//! ## State machine
//! ```text
//!  Init ──init()──► Starting ──ok──► Ready ──watch()──► Running ──stop()──► Shutdown ──release()──► Off
//!                       └──err──────────────────────────────────────────────────────────────────► Off
//!                                    Ready ──stop() before watch()──► Shutdown
//! ```
//! Every transition is a compare-and-swap; an out-of-order call returns
//! [`AppError::WrongState`] and changes nothing.
//!
//! ## Health-check loop
//! ```text
//! loop {
//!   select! {
//!     stop signal     → return Ok
//!     ctx.done()      → return ctx.error() (shutdown marker → Ok)
//!     sleep(period)   → ParallelRun(ping all) ─► Err → return Err
//!   }
//! }
//! ```
//!
//! ## Teardown
//! `release()` closes every service concurrently and waits at most the shutdown timeout.
//! Closes still running past it are left detached; the keeper reports
//! [`AppError::DeadlineExceeded`] and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::KeeperConfig;
use crate::context::Context;
use crate::core::parallel::ParallelRun;
use crate::core::state::{KeeperState, StateCell};
use crate::error::AppError;
use crate::resources::{Resources, Service, ServiceRef};

/// Canonical [`Resources`] implementation over a list of services.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use appvisor::{AppError, Context, KeeperConfig, Resources, Service, ServiceKeeper};
///
/// struct Db;
///
/// #[async_trait]
/// impl Service for Db {
///     fn name(&self) -> &str { "db" }
///     async fn init(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
///     async fn ping(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
///     async fn close(&self) -> Result<(), AppError> { Ok(()) }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), AppError> {
/// let keeper = ServiceKeeper::new(KeeperConfig::default(), vec![Arc::new(Db)]);
/// keeper.init(Context::background()).await?;
/// keeper.stop();
/// keeper.release().await?;
/// # Ok(())
/// # }
/// ```
pub struct ServiceKeeper {
    cfg: KeeperConfig,
    services: Vec<ServiceRef>,
    state: StateCell<KeeperState>,
    stop: CancellationToken,
}

impl ServiceKeeper {
    /// Creates a keeper for `services`. The list is fixed for the keeper's lifetime.
    pub fn new(cfg: KeeperConfig, services: Vec<ServiceRef>) -> Self {
        Self {
            cfg,
            services,
            state: StateCell::new(KeeperState::Init),
            stop: CancellationToken::new(),
        }
    }

    /// Keeper configuration (use the accessors to resolve defaults).
    pub fn config(&self) -> &KeeperConfig {
        &self.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> KeeperState {
        self.state.load()
    }

    /// Runs `Service::init` for every service; the first failure cancels the shared context.
    async fn init_all(&self, ctx: &Context) -> Result<(), AppError> {
        let p = ParallelRun::new(ctx.child());
        for service in &self.services {
            let service = Arc::clone(service);
            p.spawn(move |ctx| async move {
                let res = service.init(ctx.clone()).await;
                if let Err(err) = &res {
                    warn!(service = service.name(), error = %err, "service init failed");
                    ctx.cancel();
                }
                res
            });
        }
        p.join().await.map_err(AppError::from)
    }

    /// One health-check round over every service.
    async fn ping_all(&self, ctx: &Context) -> Result<(), AppError> {
        let p = ParallelRun::new(ctx.child());
        for service in &self.services {
            let service = Arc::clone(service);
            p.spawn(move |ctx| async move {
                let res = service.ping(ctx).await;
                if let Err(err) = &res {
                    warn!(service = service.name(), error = %err, "service ping failed");
                }
                res
            });
        }
        p.join().await.map_err(AppError::from)
    }

    async fn repeat_ping(&self, ctx: &Context) -> Result<(), AppError> {
        let period = self.cfg.ping_period();
        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => return Ok(()),
                _ = ctx.done() => return Err(ctx.error().unwrap_or(AppError::Canceled)),
                _ = time::sleep(period) => {
                    debug!(services = self.services.len(), "pinging services");
                    self.ping_all(ctx).await?;
                }
            }
        }
    }

    async fn close_all(&self) -> Result<(), AppError> {
        let timeout = self.cfg.shutdown_timeout();
        let p = ParallelRun::new(Context::background().with_timeout(timeout));
        for service in &self.services {
            let service = Arc::clone(service);
            p.spawn(move |_ctx| async move { service.close().await });
        }

        match time::timeout(timeout, p.join()).await {
            Ok(res) => res.map_err(AppError::from),
            Err(_elapsed) => {
                warn!(?timeout, "services did not close in time; leaving them detached");
                Err(AppError::DeadlineExceeded { timeout })
            }
        }
    }
}

#[async_trait]
impl Resources for ServiceKeeper {
    async fn init(&self, ctx: Context) -> Result<(), AppError> {
        if !self.state.advance(KeeperState::Init, KeeperState::Starting) {
            return Err(AppError::WrongState);
        }
        info!(services = self.services.len(), "initializing services");
        match self.init_all(&ctx).await {
            Ok(()) => {
                self.state.advance(KeeperState::Starting, KeeperState::Ready);
                Ok(())
            }
            Err(err) => {
                self.state.advance(KeeperState::Starting, KeeperState::Off);
                Err(err)
            }
        }
    }

    async fn watch(&self, ctx: Context) -> Result<(), AppError> {
        if !self.state.advance(KeeperState::Ready, KeeperState::Running) {
            // stop() won the race against a watcher that had not entered yet.
            if self.state.load() == KeeperState::Shutdown {
                return Ok(());
            }
            return Err(AppError::WrongState);
        }
        debug!(period = ?self.cfg.ping_period(), "watching services");
        match self.repeat_ping(&ctx).await {
            Err(err) if err.is_shutdown() => Ok(()),
            res => res,
        }
    }

    fn stop(&self) {
        loop {
            let current = self.state.load();
            if !matches!(current, KeeperState::Ready | KeeperState::Running) {
                return;
            }
            // Ready may turn into Running under our feet; retry from the fresh state.
            if self.state.advance(current, KeeperState::Shutdown) {
                debug!(from = ?current, "stopping service watcher");
                self.stop.cancel();
                return;
            }
        }
    }

    async fn release(&self) -> Result<(), AppError> {
        if !self.state.advance(KeeperState::Shutdown, KeeperState::Off) {
            return Err(AppError::WrongState);
        }
        info!(services = self.services.len(), "releasing services");
        self.close_all().await
    }
}
