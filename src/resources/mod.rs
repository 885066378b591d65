//! # Capabilities supplied by collaborators.
//!
//! - [`Service`] - one externally owned dependency (`init`, `ping`, `close`)
//! - [`Resources`] - the application's view of its dependencies (`init`, `watch`, `stop`, `release`)

#[allow(clippy::module_inception)]
mod resources;
mod service;

pub use resources::{Resources, ResourcesRef};
pub use service::{Service, ServiceRef};
