//! First-write-wins error slot shared by a supervisor and its scope context.

use std::sync::Mutex;

use crate::error::AppError;

/// Holds the first error recorded during a run; later errors are discarded.
#[derive(Debug, Default)]
pub(crate) struct ErrorSlot {
    inner: Mutex<Option<AppError>>,
}

impl ErrorSlot {
    /// Records `err` if nothing was recorded yet. Returns `true` if it was stored.
    pub(crate) fn record(&self, err: AppError) -> bool {
        let mut slot = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    /// Records the error of `res`, if any.
    pub(crate) fn record_result<T>(&self, res: Result<T, AppError>) {
        if let Err(err) = res {
            self.record(err);
        }
    }

    /// The recorded error, if any.
    pub(crate) fn get(&self) -> Option<AppError> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_wins() {
        let slot = ErrorSlot::default();
        assert!(slot.get().is_none());
        slot.record_result::<()>(Ok(()));
        assert!(slot.get().is_none());

        assert!(slot.record(AppError::TerminationTimeout));
        assert!(!slot.record(AppError::WrongState));
        slot.record_result::<()>(Err(AppError::Canceled));
        assert_eq!(slot.get(), Some(AppError::TerminationTimeout));
    }
}
