//! # Runtime configuration.
//!
//! Provides two explicit configuration values, built once by the caller and passed to constructors:
//! - [`AppConfig`] for the [`Application`](crate::Application) supervisor;
//! - [`KeeperConfig`] for the [`ServiceKeeper`](crate::ServiceKeeper).
//!
//! ## Sentinel values
//! Every duration accepts `Duration::ZERO`, which resolves to the documented default through the
//! accessor methods. Prefer the accessors over reading fields directly to avoid sprinkling
//! sentinel checks across the codebase.

use std::time::Duration;

/// Default period between two health-check rounds.
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(15);
/// Default ping timeout (stored, not enforced).
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(1500);
/// Default bound for closing all services.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);
/// Default bound for the main task to finish after a halt.
pub const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(1);
/// Default bound for resource initialization.
pub const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_secs(15);

#[inline]
fn or_default(value: Duration, default: Duration) -> Duration {
    if value == Duration::ZERO {
        default
    } else {
        value
    }
}

/// Configuration of the application supervisor.
///
/// ## Field semantics
/// - `termination_timeout`: how long a halted main task may take to return (`0s` = 1s)
/// - `initialization_timeout`: bound for `Resources::init` (`0s` = 15s)
/// - `bus_capacity`: lifecycle event ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Maximum time between halt and done before the run reports
    /// [`AppError::TerminationTimeout`](crate::AppError::TerminationTimeout).
    ///
    /// Also bounds the wait for the resource watcher during teardown.
    pub termination_timeout: Duration,

    /// Maximum time for resource initialization.
    pub initialization_timeout: Duration,

    /// Capacity of the lifecycle event broadcast channel.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl AppConfig {
    /// Termination timeout with the zero sentinel resolved.
    #[inline]
    pub fn termination_timeout(&self) -> Duration {
        or_default(self.termination_timeout, DEFAULT_TERMINATION_TIMEOUT)
    }

    /// Initialization timeout with the zero sentinel resolved.
    #[inline]
    pub fn initialization_timeout(&self) -> Duration {
        or_default(self.initialization_timeout, DEFAULT_INITIALIZATION_TIMEOUT)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for AppConfig {
    /// Default configuration:
    ///
    /// - `termination_timeout = 1s`
    /// - `initialization_timeout = 15s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
            initialization_timeout: DEFAULT_INITIALIZATION_TIMEOUT,
            bus_capacity: 1024,
        }
    }
}

/// Configuration of the resource keeper.
///
/// ## Field semantics
/// - `ping_period`: sleep between health-check rounds (`0s` = 15s)
/// - `ping_timeout`: accepted for compatibility; no ping is bounded by it (`0s` = 1.5s)
/// - `shutdown_timeout`: bound for closing every service (`0s` = 15s)
#[derive(Clone, Debug)]
pub struct KeeperConfig {
    /// Time between two rounds of `Service::ping`.
    pub ping_period: Duration,

    /// Per-ping bound. Exposed through [`KeeperConfig::ping_timeout`], never enforced.
    pub ping_timeout: Duration,

    /// Maximum time `release` waits for services to close.
    ///
    /// Closes still running past this bound keep running detached.
    pub shutdown_timeout: Duration,
}

impl KeeperConfig {
    /// Ping period with the zero sentinel resolved.
    #[inline]
    pub fn ping_period(&self) -> Duration {
        or_default(self.ping_period, DEFAULT_PING_PERIOD)
    }

    /// Ping timeout with the zero sentinel resolved.
    #[inline]
    pub fn ping_timeout(&self) -> Duration {
        or_default(self.ping_timeout, DEFAULT_PING_TIMEOUT)
    }

    /// Shutdown timeout with the zero sentinel resolved.
    #[inline]
    pub fn shutdown_timeout(&self) -> Duration {
        or_default(self.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            ping_period: DEFAULT_PING_PERIOD,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}
