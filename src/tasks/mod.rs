//! # Main task abstractions.
//!
//! - [`MainTask`] - trait for the process's primary workload
//! - [`MainFn`] - function-based implementation
//! - [`MainRef`] - shared reference to a main task (`Arc<dyn MainTask>`)

mod task;
mod task_fn;

pub use task::{BoxMainFuture, MainRef, MainTask};
pub use task_fn::MainFn;
