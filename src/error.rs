//! Error types used by the appvisor runtime, the resource keeper and collaborators.
//!
//! This module defines:
//!
//! - [`AppError`]: the closed set of failures the runtime can report.
//! - [`AggregateError`]: every failure collected from one concurrent fan-out.
//!
//! Matching is structural: use the classification helpers ([`AppError::is_shutdown`],
//! [`AppError::is_timeout`], [`AppError::is_wrong_state`]) or `matches!` on the variant.
//! [`AppError::as_label`] gives a stable snake_case label for logs/metrics.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the appvisor runtime.
///
/// Runtime failures (`WrongState`, `MainOmitted`, `TerminationTimeout`, ...) and failures of
/// collaborators (`Fail`) share one enum so that the first error of a run can be recorded
/// and surfaced regardless of where it came from.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A lifecycle method was invoked out of order.
    #[error("wrong application state")]
    WrongState,

    /// [`Application::run`](crate::Application::run) was called without a main task.
    #[error("main function is omitted")]
    MainOmitted,

    /// Non-fatal marker: the application finished shutting down without any other error.
    #[error("application is in shutdown state")]
    Shutdown,

    /// The main task did not finish within the termination timeout after a halt.
    #[error("termination timeout")]
    TerminationTimeout,

    /// A bounded operation did not finish before its deadline.
    #[error("deadline exceeded after {timeout:?}")]
    DeadlineExceeded {
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The context was cancelled explicitly.
    #[error("context cancelled")]
    Canceled,

    /// An operation panicked; the panic payload is kept as text.
    #[error("unhandled error: {error}")]
    Unhandled {
        /// Panic message.
        error: String,
    },

    /// A collaborator (service, main task) failed.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Several operations of one fan-out failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl AppError {
    /// Wraps any displayable error into [`AppError::Fail`].
    ///
    /// # Example
    /// ```
    /// use appvisor::AppError;
    ///
    /// let err = AppError::fail("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// assert_eq!(err.as_label(), "app_fail");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        AppError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::WrongState => "app_wrong_state",
            AppError::MainOmitted => "app_main_omitted",
            AppError::Shutdown => "app_shutdown",
            AppError::TerminationTimeout => "app_termination_timeout",
            AppError::DeadlineExceeded { .. } => "app_deadline_exceeded",
            AppError::Canceled => "app_canceled",
            AppError::Unhandled { .. } => "app_unhandled",
            AppError::Fail { .. } => "app_fail",
            AppError::Aggregate(_) => "app_aggregate",
        }
    }

    /// `true` for the shutdown-in-progress marker.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, AppError::Shutdown)
    }

    /// `true` for the out-of-order lifecycle call failure.
    pub fn is_wrong_state(&self) -> bool {
        matches!(self, AppError::WrongState)
    }

    /// `true` for failures caused by an elapsed bound
    /// ([`TerminationTimeout`](AppError::TerminationTimeout) or
    /// [`DeadlineExceeded`](AppError::DeadlineExceeded)).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AppError::TerminationTimeout | AppError::DeadlineExceeded { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::fail(err)
    }
}

/// # Failures collected from one concurrent fan-out.
///
/// Entries appear in completion order. An empty aggregate is never returned as an error
/// by [`ParallelRun::join`](crate::ParallelRun::join).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateError {
    errors: Vec<AppError>,
}

impl AggregateError {
    /// Creates an aggregate from already collected failures.
    pub fn new(errors: Vec<AppError>) -> Self {
        Self { errors }
    }

    /// Appends one failure.
    pub fn push(&mut self, err: AppError) {
        self.errors.push(err);
    }

    /// Collected failures.
    pub fn errors(&self) -> &[AppError] {
        &self.errors
    }

    /// Number of collected failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `true` when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("something went wrong");
        }
        f.write_str("the following errors occurred:")?;
        for err in &self.errors {
            write!(f, "\n{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_lists_every_message() {
        let agg = AggregateError::new(vec![AppError::fail("db down"), AppError::WrongState]);
        assert_eq!(
            agg.to_string(),
            "the following errors occurred:\ndb down\nwrong application state"
        );
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(AggregateError::default().into_result().is_ok());
    }

    #[test]
    fn test_classification() {
        assert!(AppError::Shutdown.is_shutdown());
        assert!(AppError::TerminationTimeout.is_timeout());
        assert!(
            AppError::DeadlineExceeded {
                timeout: Duration::from_secs(1)
            }
            .is_timeout()
        );
        assert!(!AppError::Canceled.is_timeout());
        assert!(AppError::WrongState.is_wrong_state());
    }

    #[test]
    fn test_labels_are_stable() {
        let err: AppError = AggregateError::new(vec![AppError::Canceled]).into();
        assert_eq!(err.as_label(), "app_aggregate");
        assert_eq!(
            AppError::Unhandled {
                error: "boom".into()
            }
            .to_string(),
            "unhandled error: boom"
        );
    }
}
