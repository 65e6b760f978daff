//! Single-settlement bridge from host callbacks to a future.
//!
//! Hosts report outcomes through separate `success` and `fail` callbacks and
//! nothing stops a misbehaving host from calling both. [`Settlement`] is the
//! state machine both callbacks share: the first transition out of `Pending`
//! wins, later ones are ignored along with their caller hooks.

use core_async::sync::oneshot;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

enum SettleState<T, E> {
    Pending(oneshot::Sender<Result<T, E>>),
    Succeeded,
    Failed,
}

/// Shared handle to one settle-once state machine.
pub struct Settlement<T, E> {
    state: Arc<Mutex<SettleState<T, E>>>,
}

impl<T, E> Clone for Settlement<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Settlement<T, E> {
    /// Create a pending settlement and the receiver its outcome is sent to.
    pub fn new() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (sender, receiver) = oneshot::channel();
        let settlement = Self {
            state: Arc::new(Mutex::new(SettleState::Pending(sender))),
        };
        (settlement, receiver)
    }

    /// Transition to `Succeeded`.
    ///
    /// `hook` runs before the value is delivered, and only if this call made
    /// the transition. Returns whether it did.
    pub fn succeed(&self, value: T, hook: impl FnOnce(&T)) -> bool {
        let Some(sender) = self.transition(SettleState::Succeeded) else {
            return false;
        };
        hook(&value);
        // Receiver may already be gone; the transition still counts.
        let _ = sender.send(Ok(value));
        true
    }

    /// Transition to `Failed`. Same rules as [`succeed`](Self::succeed).
    pub fn fail(&self, error: E, hook: impl FnOnce(&E)) -> bool {
        let Some(sender) = self.transition(SettleState::Failed) else {
            return false;
        };
        hook(&error);
        let _ = sender.send(Err(error));
        true
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.lock(), SettleState::Pending(_))
    }

    /// Read-only view that does not keep the sender alive.
    pub fn watch(&self) -> SettleWatch<T, E> {
        SettleWatch {
            state: Arc::downgrade(&self.state),
        }
    }

    fn transition(&self, next: SettleState<T, E>) -> Option<oneshot::Sender<Result<T, E>>> {
        let mut state = self.lock();
        if !matches!(*state, SettleState::Pending(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, next) {
            SettleState::Pending(sender) => Some(sender),
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SettleState<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> fmt::Debug for Settlement<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.lock() {
            SettleState::Pending(_) => "Pending",
            SettleState::Succeeded => "Succeeded",
            SettleState::Failed => "Failed",
        };
        f.debug_struct("Settlement").field("state", &state).finish()
    }
}

/// Observes a [`Settlement`] without owning it.
///
/// Once every `Settlement` handle is gone the receiver is closed, so a
/// dropped state counts as settled.
pub struct SettleWatch<T, E> {
    state: Weak<Mutex<SettleState<T, E>>>,
}

impl<T, E> Clone for SettleWatch<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<T, E> SettleWatch<T, E> {
    pub fn is_settled(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => !matches!(
                *state.lock().unwrap_or_else(PoisonError::into_inner),
                SettleState::Pending(_)
            ),
            None => true,
        }
    }
}

impl<T, E> fmt::Debug for SettleWatch<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettleWatch")
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[core_async::test]
    async fn test_first_transition_wins() {
        let (settlement, receiver) = Settlement::<u16, String>::new();
        let mut fail_hook_ran = false;

        assert!(settlement.succeed(200, |_| {}));
        assert!(!settlement.fail("late".to_string(), |_| fail_hook_ran = true));

        assert!(!fail_hook_ran);
        assert!(settlement.is_settled());
        assert_eq!(receiver.await.unwrap(), Ok(200));
    }

    #[core_async::test]
    async fn test_fail_delivers_error() {
        let (settlement, receiver) = Settlement::<u16, String>::new();
        let mut seen = None;

        assert!(settlement.fail("request:fail".to_string(), |e| seen = Some(e.clone())));

        assert_eq!(seen.as_deref(), Some("request:fail"));
        assert_eq!(receiver.await.unwrap(), Err("request:fail".to_string()));
    }

    #[test]
    fn test_settles_with_dropped_receiver() {
        let (settlement, receiver) = Settlement::<u16, String>::new();
        drop(receiver);
        assert!(settlement.succeed(204, |_| {}));
        assert!(!settlement.succeed(200, |_| {}));
    }

    #[core_async::test]
    async fn test_dropping_every_handle_closes_receiver() {
        let (settlement, receiver) = Settlement::<u16, String>::new();
        let clone = settlement.clone();
        drop(settlement);
        drop(clone);
        assert!(receiver.await.is_err());
    }

    #[core_async::test]
    async fn test_watch_does_not_hold_sender() {
        let (settlement, receiver) = Settlement::<u16, String>::new();
        let watch = settlement.watch();
        assert!(!watch.is_settled());

        drop(settlement);
        assert!(watch.is_settled());
        assert!(receiver.await.is_err());
    }

    #[test]
    fn test_watch_sees_transition() {
        let (settlement, _receiver) = Settlement::<u16, String>::new();
        let watch = settlement.watch();
        settlement.succeed(200, |_| {});
        assert!(watch.is_settled());
    }

    #[test]
    fn test_debug_shows_state() {
        let (settlement, _receiver) = Settlement::<u16, String>::new();
        assert!(format!("{:?}", settlement).contains("Pending"));
        settlement.fail("x".to_string(), |_| {});
        assert!(format!("{:?}", settlement).contains("Failed"));
    }
}
