//! # Forward-only lifecycle states.
//!
//! Each owner (keeper, application) keeps its state in one [`StateCell`], a single atomic word
//! mutated only through compare-and-swap. Concurrent callers attempting the same transition race
//! safely: exactly one wins, the others observe `false`.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};

/// States representable in a [`StateCell`].
pub(crate) trait LifecycleState: Copy + Eq {
    fn to_u8(self) -> u8;
    fn from_u8(raw: u8) -> Self;
}

/// Atomic holder of a lifecycle state.
#[derive(Debug)]
pub(crate) struct StateCell<S> {
    raw: AtomicU8,
    _state: PhantomData<S>,
}

impl<S: LifecycleState> StateCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            raw: AtomicU8::new(initial.to_u8()),
            _state: PhantomData,
        }
    }

    /// Moves `from → to` if the current state is `from`. Returns whether this caller won.
    pub(crate) fn advance(&self, from: S, to: S) -> bool {
        self.raw
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn load(&self) -> S {
        S::from_u8(self.raw.load(Ordering::Acquire))
    }
}

/// Resource keeper states.
///
/// `Init → Ready → Running → Shutdown → Off`. `Starting` is held while services initialize so a
/// concurrent `init` observes a wrong state; a failed init ends in `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperState {
    /// Created, `init` not called yet.
    Init,
    /// `init` in progress.
    Starting,
    /// Every service initialized; waiting for `watch`.
    Ready,
    /// Health-check loop running.
    Running,
    /// `stop` called; waiting for `release`.
    Shutdown,
    /// Released, or initialization failed.
    Off,
}

impl LifecycleState for KeeperState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => KeeperState::Init,
            1 => KeeperState::Starting,
            2 => KeeperState::Ready,
            3 => KeeperState::Running,
            4 => KeeperState::Shutdown,
            _ => KeeperState::Off,
        }
    }
}

/// Application states: `Init → Running → Halt → Shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Built, `run` not called yet.
    Init,
    /// Main task and resources running.
    Running,
    /// Halt broadcast fired; the main task should wind down.
    Halt,
    /// Done broadcast fired; teardown in progress or finished.
    Shutdown,
}

impl LifecycleState for AppState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => AppState::Init,
            1 => AppState::Running,
            2 => AppState::Halt,
            _ => AppState::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_from_expected_state() {
        let cell = StateCell::new(AppState::Init);
        assert!(!cell.advance(AppState::Running, AppState::Halt));
        assert!(cell.advance(AppState::Init, AppState::Running));
        assert!(!cell.advance(AppState::Init, AppState::Running));
        assert_eq!(cell.load(), AppState::Running);
    }

    #[test]
    fn test_concurrent_advance_has_one_winner() {
        let cell = std::sync::Arc::new(StateCell::new(KeeperState::Running));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || cell.advance(KeeperState::Running, KeeperState::Shutdown))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(cell.load(), KeeperState::Shutdown);
    }
}
