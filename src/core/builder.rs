use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::supervisor::Application;
use crate::{
    config::AppConfig,
    events::Bus,
    resources::ResourcesRef,
    subscribers::{Subscribe, SubscriberSet},
    tasks::MainRef,
};

/// Builder for constructing an [`Application`].
pub struct ApplicationBuilder {
    cfg: AppConfig,
    main: Option<MainRef>,
    resources: Option<ResourcesRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    signal: Option<BoxFuture<'static, ()>>,
}

impl ApplicationBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: AppConfig) -> Self {
        Self {
            cfg,
            main: None,
            resources: None,
            subscribers: Vec::new(),
            signal: None,
        }
    }

    /// Sets the main task. Without one, [`Application::run`] fails with `MainOmitted`.
    pub fn with_main(mut self, main: MainRef) -> Self {
        self.main = Some(main);
        self
    }

    /// Sets the resources kept alive while the main task runs.
    pub fn with_resources(mut self, resources: ResourcesRef) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Sets lifecycle event subscribers.
    ///
    /// Subscribers receive application events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces OS signal handling with a custom termination source.
    ///
    /// The application halts once `signal` completes.
    pub fn with_shutdown_signal<F>(mut self, signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.signal = Some(signal.boxed());
        self
    }

    /// Builds the application.
    ///
    /// Spawns subscriber workers, so it must be called within a Tokio runtime
    /// when subscribers are set.
    pub fn build(self) -> Application {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        Application::new_internal(
            self.cfg,
            self.main,
            self.resources,
            subs,
            self.signal,
            bus,
        )
    }
}
