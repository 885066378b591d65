//! # Application: lifecycle supervisor for one main task and its resources.
//!
//! The [`Application`] runs a caller-supplied [`MainTask`], keeps its [`Resources`] alive
//! while it runs, reacts to termination signals and drives a bounded, ordered shutdown.
//!
//! ## Key responsibilities
//! - initialize resources within the initialization timeout
//! - watch resources in the background; a watcher exit shuts the application down
//! - run the main task with the supervisor [`Context`] and the [`HaltSignal`]
//! - on a termination signal: halt, then wait up to the termination timeout for done
//! - stop and release resources, then surface the **first** error recorded anywhere
//!
//! ## High-level architecture
//! ```text
//! run():
//!   MainOmitted? ─► Init→Running (CAS) ─► Resources::init(ctx + init timeout)
//!                                              ├─ Err ─► record, shutdown(), return
//!                                              ▼
//!   spawn watcher: Resources::watch(ctx) ─► record result ─► shutdown()
//!   register signals
//!   race:
//!     ├─ main task:    MainTask::spawn(ctx, halt)              ─► result
//!     ├─ halt watcher: signal ─► halt() ─► wait done ≤ termination timeout
//!     │                                     └─ elapsed ─► TerminationTimeout
//!     └─ done fired
//!     (first to finish wins) ─► shutdown()
//!   Resources::stop() ─► wait watcher ≤ termination timeout ─► Resources::release()
//!   return first recorded error
//! ```
//!
//! ## State machine
//! `Init → Running → Halt → Shutdown`, forward only. [`Application::halt`] fires the halt
//! broadcast on `Running → Halt`; [`Application::shutdown`] always halts first and fires the
//! done broadcast on `Halt → Shutdown`, so halt is never observed after done.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::context::slot::ErrorSlot;
use crate::context::{Context, HaltSignal};
use crate::core::builder::ApplicationBuilder;
use crate::core::parallel::{join_failure, panic_message};
use crate::core::shutdown::Signals;
use crate::core::state::{AppState, StateCell};
use crate::error::AppError;
use crate::events::{Bus, Event, EventKind};
use crate::resources::ResourcesRef;
use crate::subscribers::SubscriberSet;
use crate::tasks::MainRef;

/// State shared between `run()` and its background tasks.
struct Lifecycle {
    state: StateCell<AppState>,
    halt: CancellationToken,
    done: CancellationToken,
    errors: Arc<ErrorSlot>,
    bus: Bus,
}

impl Lifecycle {
    fn halt(&self) {
        if self.state.advance(AppState::Running, AppState::Halt) {
            self.bus.publish(Event::new(EventKind::HaltRequested));
            self.halt.cancel();
        }
    }

    fn shutdown(&self) {
        self.halt();
        if self.state.advance(AppState::Halt, AppState::Shutdown) {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.done.cancel();
        }
    }
}

/// Lifecycle supervisor of one application run.
///
/// # Example
/// ```
/// use appvisor::{AppConfig, AppError, Application, Context, HaltSignal, MainFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), AppError> {
/// let app = Application::builder(AppConfig::default())
///     .with_main(MainFn::arc("oneshot", |_ctx: Context, _halt: HaltSignal| async {
///         Ok::<_, AppError>(())
///     }))
///     .build();
///
/// app.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    cfg: AppConfig,
    main: Option<MainRef>,
    resources: Option<ResourcesRef>,
    subs: Mutex<Option<SubscriberSet>>,
    signal: Mutex<Option<BoxFuture<'static, ()>>>,
    inner: Arc<Lifecycle>,
}

impl Application {
    /// Starts building an application with the given configuration.
    pub fn builder(cfg: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: AppConfig,
        main: Option<MainRef>,
        resources: Option<ResourcesRef>,
        subs: SubscriberSet,
        signal: Option<BoxFuture<'static, ()>>,
        bus: Bus,
    ) -> Self {
        Self {
            cfg,
            main,
            resources,
            subs: Mutex::new(Some(subs)),
            signal: Mutex::new(signal),
            inner: Arc::new(Lifecycle {
                state: StateCell::new(AppState::Init),
                halt: CancellationToken::new(),
                done: CancellationToken::new(),
                errors: Arc::new(ErrorSlot::default()),
                bus,
            }),
        }
    }

    /// Application configuration (use the accessors to resolve defaults).
    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        self.inner.state.load()
    }

    /// The supervisor as a cancellation context.
    ///
    /// Done once the application shut down. Its error is the first recorded error, or
    /// [`AppError::Shutdown`] once shutdown completed without one. No deadline.
    pub fn context(&self) -> Context {
        Context::scoped(self.inner.done.clone(), Arc::clone(&self.inner.errors))
    }

    /// The halt broadcast, as handed to the main task.
    pub fn halt_signal(&self) -> HaltSignal {
        HaltSignal::new(self.inner.halt.clone())
    }

    /// Event bus carrying this application's lifecycle events.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Fires the halt broadcast. Idempotent; only effective while running.
    pub fn halt(&self) {
        self.inner.halt();
    }

    /// Halts, then fires the done broadcast. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Runs the application until its lifecycle completes.
    ///
    /// Returns the first error recorded during the run: resource initialization, main task,
    /// termination timeout, resource watcher or resource release.
    pub async fn run(&self) -> Result<(), AppError> {
        let main = self.main.clone().ok_or(AppError::MainOmitted)?;
        if !self.inner.state.advance(AppState::Init, AppState::Running) {
            return Err(AppError::WrongState);
        }
        let listener = self.event_listener();
        self.inner.bus.publish(Event::new(EventKind::AppStarting));

        if let Err(err) = self.init_resources().await {
            self.inner.errors.record(err);
            self.inner.shutdown();
            return self.finish(listener).await;
        }
        let watcher = self.resources.clone().map(|r| self.spawn_watcher(r));

        match self.signals() {
            Ok(signals) => {
                let res = self.race(main, signals).await;
                self.inner.errors.record_result(res);
            }
            Err(err) => {
                self.inner.errors.record(err);
                self.inner.shutdown();
            }
        }

        if let Some(resources) = &self.resources {
            resources.stop();
            if let Some(watcher) = watcher {
                let _ = time::timeout(self.cfg.termination_timeout(), watcher).await;
            }
            let res = resources.release().await;
            self.inner
                .bus
                .publish(Event::new(EventKind::ResourcesReleased).with_outcome(&res));
            self.inner.errors.record_result(res);
        }
        self.finish(listener).await
    }

    /// Forwards bus events to the subscriber set until `AppStopped` went through,
    /// then drains the subscriber queues.
    fn event_listener(&self) -> Option<JoinHandle<()>> {
        let set = self
            .subs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .filter(|set| !set.is_empty())?;
        let mut rx = self.inner.bus.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.kind == EventKind::AppStopped => {
                        set.emit(&ev);
                        break;
                    }
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        }))
    }

    async fn init_resources(&self) -> Result<(), AppError> {
        let Some(resources) = &self.resources else {
            return Ok(());
        };
        let timeout = self.cfg.initialization_timeout();
        let ctx = self.context().with_timeout(timeout);

        let res = match time::timeout(timeout, resources.init(ctx)).await {
            Ok(res) => res,
            Err(_elapsed) => Err(AppError::DeadlineExceeded { timeout }),
        };
        let ev = match &res {
            Ok(()) => Event::new(EventKind::ResourcesReady).with_timeout(timeout),
            Err(err) => Event::new(EventKind::ResourcesFailed).with_reason(err.to_string()),
        };
        self.inner.bus.publish(ev);
        res
    }

    /// Watches resources in the background; whatever it returns shuts the application down.
    fn spawn_watcher(&self, resources: ResourcesRef) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let ctx = self.context();
        inner.bus.publish(Event::new(EventKind::WatcherStarted));

        tokio::spawn(async move {
            let res = match AssertUnwindSafe(resources.watch(ctx)).catch_unwind().await {
                Ok(res) => res,
                Err(panic) => Err(AppError::Unhandled {
                    error: panic_message(&*panic),
                }),
            };
            inner
                .bus
                .publish(Event::new(EventKind::WatcherExited).with_outcome(&res));
            inner.errors.record_result(res);
            inner.shutdown();
        })
    }

    fn signals(&self) -> Result<Signals, AppError> {
        let custom = self
            .signal
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        match custom {
            Some(fut) => Ok(Signals::Custom(fut)),
            None => Ok(Signals::os()?),
        }
    }

    /// Runs the main task against the halt watcher and the done signal.
    async fn race(&self, main: MainRef, signals: Signals) -> Result<(), AppError> {
        let term = self.cfg.termination_timeout();
        let main_name = main.name().to_string();

        let ctx = self.context();
        let halt = self.halt_signal();
        let mut main_task = tokio::spawn(async move { main.spawn(ctx, halt).await });

        let inner = Arc::clone(&self.inner);
        let mut halt_task = tokio::spawn(async move {
            tokio::select! {
                _ = signals.recv() => {
                    inner.bus.publish(Event::new(EventKind::SignalReceived));
                    inner.halt();
                    match time::timeout(term, inner.done.cancelled()).await {
                        Ok(()) => Ok(()),
                        Err(_elapsed) => {
                            inner.bus.publish(Event::new(EventKind::TerminationTimeout).with_timeout(term));
                            Err(AppError::TerminationTimeout)
                        }
                    }
                }
                _ = inner.done.cancelled() => Ok(()),
            }
        });

        let res = tokio::select! {
            res = &mut main_task => {
                let res = res.unwrap_or_else(|e| Err(join_failure(e)));
                self.inner.bus.publish(
                    Event::new(EventKind::MainExited)
                        .with_source(main_name)
                        .with_outcome(&res),
                );
                res
            }
            res = &mut halt_task => res.unwrap_or_else(|e| Err(join_failure(e))),
            _ = self.inner.done.cancelled() => Ok(()),
        };
        self.inner.shutdown();
        res
    }

    /// Publishes `AppStopped` and waits, at most the termination timeout, for subscribers
    /// to process everything up to it.
    async fn finish(&self, listener: Option<JoinHandle<()>>) -> Result<(), AppError> {
        let res = match self.inner.errors.get() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        self.inner
            .bus
            .publish(Event::new(EventKind::AppStopped).with_outcome(&res));
        if let Some(listener) = listener {
            let _ = time::timeout(self.cfg.termination_timeout(), listener).await;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeeperConfig;
    use crate::core::keeper::ServiceKeeper;
    use crate::resources::Service;
    use crate::subscribers::Subscribe;
    use crate::tasks::MainFn;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Probe {
        fail_init: bool,
        fail_ping_after: Option<usize>,
        inits: AtomicUsize,
        pings: AtomicUsize,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Service for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        async fn init(&self, _ctx: Context) -> Result<(), AppError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err(AppError::fail("storage unreachable"));
            }
            Ok(())
        }

        async fn ping(&self, _ctx: Context) -> Result<(), AppError> {
            let n = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_ping_after {
                Some(limit) if n > limit => Err(AppError::fail("ping lost")),
                _ => Ok(()),
            }
        }

        async fn close(&self) -> Result<(), AppError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn cfg() -> AppConfig {
        AppConfig {
            termination_timeout: Duration::from_millis(500),
            ..AppConfig::default()
        }
    }

    fn keeper(services: Vec<Arc<Probe>>) -> Arc<ServiceKeeper> {
        let services = services
            .into_iter()
            .map(|s| s as Arc<dyn Service>)
            .collect();
        Arc::new(ServiceKeeper::new(
            KeeperConfig {
                ping_period: Duration::from_millis(100),
                ..KeeperConfig::default()
            },
            services,
        ))
    }

    fn until_halted() -> MainRef {
        MainFn::arc("until-halted", |_ctx: Context, halt: HaltSignal| async move {
            halt.halted().await;
            Ok(())
        })
    }

    fn never_signal() -> impl std::future::Future<Output = ()> + Send + 'static {
        std::future::pending()
    }

    #[tokio::test]
    async fn test_main_omitted() {
        let app = Application::builder(cfg())
            .with_shutdown_signal(never_signal())
            .build();
        assert_eq!(app.run().await, Err(AppError::MainOmitted));
        assert_eq!(app.state(), AppState::Init);
    }

    #[tokio::test]
    async fn test_immediate_main_without_resources() {
        let app = Application::builder(cfg())
            .with_main(MainFn::arc("noop", |_ctx: Context, _halt: HaltSignal| async {
                Ok(())
            }))
            .with_shutdown_signal(never_signal())
            .build();

        assert_eq!(app.run().await, Ok(()));
        assert_eq!(app.state(), AppState::Shutdown);
        assert_eq!(app.context().error(), Some(AppError::Shutdown));
        assert_eq!(app.run().await, Err(AppError::WrongState));
        assert_eq!(app.state(), AppState::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_then_main_ignores_halt() {
        let app = Application::builder(cfg())
            .with_main(MainFn::arc("stubborn", |_ctx: Context, _halt: HaltSignal| async {
                std::future::pending::<()>().await;
                Ok(())
            }))
            .with_shutdown_signal(time::sleep(Duration::from_millis(50)))
            .build();

        let started = time::Instant::now();
        assert_eq!(app.run().await, Err(AppError::TerminationTimeout));
        assert!(started.elapsed() >= Duration::from_millis(550));
        assert_eq!(app.state(), AppState::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_then_main_honours_halt() {
        let app = Application::builder(cfg())
            .with_main(until_halted())
            .with_shutdown_signal(time::sleep(Duration::from_millis(50)))
            .build();

        assert_eq!(app.run().await, Ok(()));
        assert!(app.halt_signal().is_halted());
        assert!(app.context().is_done());
    }

    #[tokio::test]
    async fn test_init_failure_skips_watch_and_close() {
        let good = Arc::new(Probe::default());
        let bad = Arc::new(Probe {
            fail_init: true,
            ..Probe::default()
        });
        let main_runs = Arc::new(AtomicUsize::new(0));
        let counter = main_runs.clone();

        let app = Application::builder(cfg())
            .with_main(MainFn::arc("server", move |_ctx: Context, _halt: HaltSignal| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .with_resources(keeper(vec![good.clone(), bad.clone()]))
            .with_shutdown_signal(never_signal())
            .build();

        match app.run().await {
            Err(AppError::Aggregate(agg)) => {
                assert_eq!(agg.errors(), &[AppError::fail("storage unreachable")]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(main_runs.load(Ordering::SeqCst), 0);
        for probe in [&good, &bad] {
            assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
            assert_eq!(probe.pings.load(Ordering::SeqCst), 0);
            assert_eq!(probe.closes.load(Ordering::SeqCst), 0);
        }
        assert_eq!(app.state(), AppState::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_failure_shuts_down_running_main() {
        let probe = Arc::new(Probe {
            fail_ping_after: Some(3),
            ..Probe::default()
        });
        let app = Application::builder(cfg())
            .with_main(until_halted())
            .with_resources(keeper(vec![probe.clone()]))
            .with_shutdown_signal(never_signal())
            .build();

        let err = app.run().await.unwrap_err();
        assert!(err.to_string().contains("ping lost"), "got {err}");
        assert_eq!(probe.pings.load(Ordering::SeqCst), 4);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(app.context().error(), Some(err));
    }

    #[tokio::test(start_paused = true)]
    async fn test_main_error_wins_and_resources_are_released() {
        let probe = Arc::new(Probe::default());
        let app = Application::builder(cfg())
            .with_main(MainFn::arc("failing", |_ctx: Context, _halt: HaltSignal| async {
                time::sleep(Duration::from_millis(250)).await;
                Err(AppError::fail("listener crashed"))
            }))
            .with_resources(keeper(vec![probe.clone()]))
            .with_shutdown_signal(never_signal())
            .build();

        assert_eq!(app.run().await, Err(AppError::fail("listener crashed")));
        assert_eq!(probe.pings.load(Ordering::SeqCst), 2);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_main_panic_is_reported() {
        let app = Application::builder(cfg())
            .with_main(MainFn::arc("panicky", |_ctx: Context, _halt: HaltSignal| async {
                panic!("handler bug");
            }))
            .with_shutdown_signal(never_signal())
            .build();

        assert_eq!(
            app.run().await,
            Err(AppError::Unhandled {
                error: "handler bug".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resource_init_is_bounded() {
        struct Hanging;

        #[async_trait]
        impl Service for Hanging {
            async fn init(&self, _ctx: Context) -> Result<(), AppError> {
                std::future::pending().await
            }
            async fn ping(&self, _ctx: Context) -> Result<(), AppError> {
                Ok(())
            }
            async fn close(&self) -> Result<(), AppError> {
                Ok(())
            }
        }

        let app = Application::builder(AppConfig {
            initialization_timeout: Duration::from_secs(3),
            ..cfg()
        })
        .with_main(until_halted())
        .with_resources(Arc::new(ServiceKeeper::new(
            KeeperConfig::default(),
            vec![Arc::new(Hanging)],
        )))
        .with_shutdown_signal(never_signal())
        .build();

        assert_eq!(
            app.run().await,
            Err(AppError::DeadlineExceeded {
                timeout: Duration::from_secs(3)
            })
        );
    }

    #[tokio::test]
    async fn test_external_shutdown_is_idempotent() {
        let app = Arc::new(
            Application::builder(cfg())
                .with_main(until_halted())
                .with_shutdown_signal(never_signal())
                .build(),
        );
        let runner = {
            let app = app.clone();
            tokio::spawn(async move { app.run().await })
        };

        let ctx = app.context();
        while app.state() != AppState::Running {
            tokio::task::yield_now().await;
        }
        app.halt();
        app.halt();
        assert!(app.halt_signal().is_halted());
        assert!(!ctx.is_done());

        app.shutdown();
        app.shutdown();
        ctx.done().await;
        assert_eq!(runner.await.unwrap(), Ok(()));
        assert_eq!(ctx.error(), Some(AppError::Shutdown));
    }

    #[tokio::test]
    async fn test_halt_is_observed_before_done() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let app = Arc::new(
            Application::builder(cfg())
                .with_main(MainFn::arc("observer", move |ctx: Context, halt: HaltSignal| {
                    let tx = tx.clone();
                    async move {
                        ctx.done().await;
                        let _ = tx.send(halt.is_halted());
                        Ok(())
                    }
                }))
                .with_shutdown_signal(never_signal())
                .build(),
        );
        let runner = {
            let app = app.clone();
            tokio::spawn(async move { app.run().await })
        };
        while app.state() != AppState::Running {
            tokio::task::yield_now().await;
        }

        app.shutdown();
        assert_eq!(rx.recv().await, Some(true));
        assert_eq!(runner.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_lifecycle_events_reach_subscribers() {
        struct Collector {
            tx: tokio::sync::mpsc::UnboundedSender<EventKind>,
        }

        #[async_trait]
        impl Subscribe for Collector {
            async fn on_event(&self, event: &Event) {
                let _ = self.tx.send(event.kind);
            }
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let app = Application::builder(cfg())
            .with_main(until_halted())
            .with_subscribers(vec![Arc::new(Collector { tx })])
            .with_shutdown_signal(async {})
            .build();
        assert_eq!(app.run().await, Ok(()));

        let mut seen = Vec::new();
        while let Some(kind) = rx.recv().await {
            seen.push(kind);
            if kind == EventKind::AppStopped {
                break;
            }
        }
        let pos = |k: EventKind| seen.iter().position(|s| *s == k).unwrap();
        assert!(pos(EventKind::AppStarting) < pos(EventKind::SignalReceived));
        assert!(pos(EventKind::HaltRequested) < pos(EventKind::ShutdownRequested));
        assert!(pos(EventKind::ShutdownRequested) < pos(EventKind::AppStopped));
    }

    #[tokio::test]
    async fn test_unbounded_initialization_timeout() {
        let probe = Arc::new(Probe::default());
        let app = Application::builder(AppConfig {
            initialization_timeout: Duration::MAX,
            ..cfg()
        })
        .with_main(MainFn::arc("noop", |_ctx: Context, _halt: HaltSignal| async {
            Ok(())
        }))
        .with_resources(keeper(vec![probe.clone()]))
        .with_shutdown_signal(never_signal())
        .build();

        assert_eq!(app.run().await, Ok(()));
        assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_are_flushed_before_run_returns() {
        struct Journal {
            seen: Arc<Mutex<Vec<EventKind>>>,
        }

        #[async_trait]
        impl Subscribe for Journal {
            async fn on_event(&self, event: &Event) {
                tokio::task::yield_now().await;
                self.seen.lock().unwrap().push(event.kind);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Application::builder(cfg())
            .with_main(MainFn::arc("failing", |_ctx: Context, _halt: HaltSignal| async {
                Err(AppError::fail("listener crashed"))
            }))
            .with_subscribers(vec![Arc::new(Journal { seen: seen.clone() })])
            .with_shutdown_signal(never_signal())
            .build();

        assert_eq!(app.run().await, Err(AppError::fail("listener crashed")));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&EventKind::AppStarting));
        assert!(seen.contains(&EventKind::MainExited));
        assert_eq!(seen.last(), Some(&EventKind::AppStopped));
    }
}
