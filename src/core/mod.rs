//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Application`] (the supervisor), [`ServiceKeeper`]
//! (the default [`Resources`](crate::Resources) implementation) and [`ParallelRun`].
//!
//! Internal modules:
//! - [`supervisor`]: runs the main task, watches resources, handles shutdown;
//! - [`keeper`]: initializes, pings and closes a list of services;
//! - [`parallel`]: spawns operations and joins them into an aggregate error;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`state`]: compare-and-swap lifecycle state machines.

mod builder;
mod keeper;
pub(crate) mod parallel;
mod shutdown;
mod state;
mod supervisor;

pub use builder::ApplicationBuilder;
pub use keeper::ServiceKeeper;
pub use parallel::ParallelRun;
pub use state::{AppState, KeeperState};
pub use supervisor::Application;
