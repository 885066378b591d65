//! # Cancellation primitives shared by the runtime and its collaborators.
//!
//! - [`Context`] - done-signal, optional deadline and error query
//! - [`HaltSignal`] - read-only halt broadcast handed to the main task

mod halt;
pub(crate) mod slot;
mod token;

pub use halt::HaltSignal;
pub use token::Context;
