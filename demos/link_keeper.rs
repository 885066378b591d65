//! # Example: link_keeper
//!
//! A tiny link shortener supervised by [`Application`].
//!
//! Shows how to:
//! - Implement [`Service`] for an externally owned dependency (an in-memory link store).
//! - Keep it alive with [`ServiceKeeper`] (init, periodic ping, bounded close).
//! - Run a main task that works until the [`HaltSignal`] fires.
//! - Attach the built-in [`LogWriter`] and exit non-zero when the run fails.
//!
//! ## Flow
//! ```text
//! Application::run()
//!     ├─► ServiceKeeper::init()  ──► LinkStore::init()
//!     ├─► ServiceKeeper::watch() ──► LinkStore::ping() every ping period
//!     ├─► shortener loop: save + resolve links until halted
//!     │     └─► Ctrl-C / SIGTERM ──► halt ──► loop returns
//!     └─► ServiceKeeper::release() ──► LinkStore::close()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example link_keeper
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use appvisor::{
    AppConfig, AppError, Application, Context, HaltSignal, KeeperConfig, LogWriter, MainFn,
    Service, ServiceKeeper, Subscribe,
};

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Strips the scheme, a leading `www.` and trailing slashes.
fn normalize(link: &str) -> &str {
    let link = link
        .strip_prefix("http://")
        .or_else(|| link.strip_prefix("https://"))
        .unwrap_or(link);
    let link = link.strip_prefix("www.").unwrap_or(link);
    link.trim_end_matches('/')
}

fn encode(mut n: u64) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[(n % ALPHABET.len() as u64) as usize]);
        n /= ALPHABET.len() as u64;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Default)]
struct Links {
    open: bool,
    next_id: u64,
    by_short: HashMap<String, String>,
}

/// In-memory link store.
#[derive(Default)]
struct LinkStore {
    inner: RwLock<Links>,
}

impl LinkStore {
    async fn save(&self, full: &str) -> Result<String, AppError> {
        let mut links = self.inner.write().await;
        if !links.open {
            return Err(AppError::fail("link store is closed"));
        }
        links.next_id += 1;
        let short = encode(links.next_id + 10_000);
        links.by_short.insert(short.clone(), normalize(full).to_string());
        Ok(short)
    }

    async fn resolve(&self, short: &str) -> Result<String, AppError> {
        self.inner
            .read()
            .await
            .by_short
            .get(short)
            .cloned()
            .ok_or_else(|| AppError::fail(format!("link {short} not found")))
    }
}

#[async_trait]
impl Service for LinkStore {
    fn name(&self) -> &str {
        "link-store"
    }

    async fn init(&self, _ctx: Context) -> Result<(), AppError> {
        self.inner.write().await.open = true;
        info!("link store opened");
        Ok(())
    }

    async fn ping(&self, _ctx: Context) -> Result<(), AppError> {
        let links = self.inner.read().await;
        if !links.open {
            return Err(AppError::fail("link store is closed"));
        }
        info!(links = links.by_short.len(), "link store healthy");
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut links = self.inner.write().await;
        links.open = false;
        info!(links = links.by_short.len(), "link store closed");
        Ok(())
    }
}

async fn shorten_until_halted(store: Arc<LinkStore>, halt: HaltSignal) -> Result<(), AppError> {
    const SOURCES: [&str; 4] = [
        "https://www.rust-lang.org/",
        "https://docs.rs/tokio",
        "http://crates.io/crates/tracing/",
        "https://github.com/tokio-rs/tokio",
    ];

    let mut tick = tokio::time::interval(Duration::from_millis(500));
    for source in SOURCES.iter().cycle() {
        tokio::select! {
            _ = halt.halted() => break,
            _ = tick.tick() => {
                let short = store.save(source).await?;
                let full = store.resolve(&short).await?;
                info!(%short, %full, "link shortened");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = Arc::new(LinkStore::default());
    let keeper = ServiceKeeper::new(
        KeeperConfig {
            ping_period: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            ..KeeperConfig::default()
        },
        vec![store.clone() as Arc<dyn Service>],
    );

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let app = Application::builder(AppConfig {
        termination_timeout: Duration::from_secs(10),
        ..AppConfig::default()
    })
    .with_resources(Arc::new(keeper))
    .with_subscribers(subs)
    .with_main(MainFn::arc("shortener", move |_ctx: Context, halt: HaltSignal| {
        shorten_until_halted(store.clone(), halt)
    }))
    .build();

    app.run().await?;
    Ok(())
}
