//! # appvisor
//!
//! **Appvisor** is a lightweight application lifecycle supervisor for long-running Rust services.
//!
//! It runs one main task (typically a network listener), keeps the services it depends on alive
//! with periodic health checks, reacts to termination signals and tears everything down in a
//! bounded, ordered way. The first failure recorded anywhere becomes the result of the run.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │   Service    │
//!     │  (storage)   │   │   (cache)    │   │  (broker)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ServiceKeeper (Resources)                                        │
//! │  - init all concurrently (ParallelRun, first failure cancels)     │
//! │  - ping all every ping period until stop or failure               │
//! │  - close all concurrently, bounded by the shutdown timeout        │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Application (supervisor)                                         │
//! │  - Context (done + first recorded error)                          │
//! │  - HaltSignal (cooperative stop for the main task)                │
//! │  - OS signals / custom shutdown future                            │
//! │  - Bus ─► SubscriberSet ─► LogWriter / custom subscribers         │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │  MainTask (MainFn)   │
//!                     │  spawn(ctx, halt)    │
//!                     └──────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Application::run()
//!   ├─ Resources::init(ctx, initialization timeout) ── Err ─► shutdown, return error
//!   ├─ spawn Resources::watch(ctx) ── returns ─► shutdown
//!   ├─ race { main task | signal ─► halt ─► done ≤ termination timeout | done }
//!   ├─ shutdown: halt fires before done
//!   ├─ Resources::stop(), wait watcher ≤ termination timeout
//!   ├─ Resources::release()
//!   └─ return first recorded error
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Run a main task with bounded termination and ordered teardown.     | [`Application`], [`ApplicationBuilder`]    |
//! | **Resources**     | Init, health-check and close externally owned dependencies.       | [`Service`], [`Resources`], [`ServiceKeeper`] |
//! | **Concurrency**   | Fan out operations and collect every failure.                      | [`ParallelRun`], [`AggregateError`]        |
//! | **Cancellation**  | Done-signal with deadline and error query, cooperative halt.       | [`Context`], [`HaltSignal`]                |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom subscribers). | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | One typed error for runtime and collaborator failures.             | [`AppError`]                               |
//! | **Configuration** | Centralize timeouts with zero-means-default sentinels.             | [`AppConfig`], [`KeeperConfig`]            |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use appvisor::{
//!     AppConfig, AppError, Application, Context, HaltSignal, KeeperConfig, LogWriter, MainFn,
//!     Service, ServiceKeeper, Subscribe,
//! };
//!
//! struct Storage;
//!
//! #[async_trait]
//! impl Service for Storage {
//!     fn name(&self) -> &str { "storage" }
//!     async fn init(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
//!     async fn ping(&self, _ctx: Context) -> Result<(), AppError> { Ok(()) }
//!     async fn close(&self) -> Result<(), AppError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), AppError> {
//!     let keeper = ServiceKeeper::new(KeeperConfig::default(), vec![Arc::new(Storage)]);
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let app = Application::builder(AppConfig::default())
//!         .with_resources(Arc::new(keeper))
//!         .with_subscribers(subs)
//!         // Stop after a moment instead of waiting for SIGINT/SIGTERM.
//!         .with_shutdown_signal(tokio::time::sleep(Duration::from_millis(10)))
//!         .with_main(MainFn::arc("server", |_ctx: Context, halt: HaltSignal| async move {
//!             halt.halted().await;
//!             Ok(())
//!         }))
//!         .build();
//!
//!     app.run().await
//! }
//! ```
mod config;
mod context;
mod core;
mod error;
mod events;
mod resources;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{AppConfig, KeeperConfig};
pub use context::{Context, HaltSignal};
pub use core::{AppState, Application, ApplicationBuilder, KeeperState, ParallelRun, ServiceKeeper};
pub use error::{AggregateError, AppError};
pub use events::{Bus, Event, EventKind};
pub use resources::{Resources, ResourcesRef, Service, ServiceRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{BoxMainFuture, MainFn, MainRef, MainTask};
