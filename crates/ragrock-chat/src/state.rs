//! Chat session state machine with thread-safe transitions.
//!
//! Valid transitions:
//! - Idle -> Submitting (question accepted, request dispatched)
//! - Submitting -> Idle (answer or error recorded)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ChatError;

/// Request lifecycle state of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No request in flight. Ready to accept a question.
    Idle,
    /// A chat request is awaiting its response.
    Submitting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Submitting => write!(f, "Submitting"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Submitting)
                | (SessionState::Submitting, SessionState::Idle)
        )
    }
}

/// Shared state machine for one session.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<SessionState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current state.
    pub fn current(&self) -> SessionState {
        *self.lock()
    }

    /// Atomically move `Idle -> Submitting`.
    ///
    /// Returns `false` without changing anything if a request is already in
    /// flight.
    pub fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if *state == SessionState::Idle {
            tracing::debug!("Chat state: Idle -> Submitting");
            *state = SessionState::Submitting;
            true
        } else {
            false
        }
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: SessionState) -> Result<(), ChatError> {
        let mut state = self.lock();
        if state.can_transition_to(&target) {
            tracing::debug!("Chat state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: state.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Force the state machine back to Idle.
    pub fn reset(&self) {
        let mut state = self.lock();
        tracing::warn!("Chat state machine reset to Idle from {}", *state);
        *state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Submitting.to_string(), "Submitting");
    }

    #[test]
    fn test_transition_table() {
        assert!(SessionState::Idle.can_transition_to(&SessionState::Submitting));
        assert!(SessionState::Submitting.can_transition_to(&SessionState::Idle));
        assert!(!SessionState::Idle.can_transition_to(&SessionState::Idle));
        assert!(!SessionState::Submitting.can_transition_to(&SessionState::Submitting));
    }

    #[test]
    fn test_try_begin_only_once() {
        let sm = StateMachine::new();
        assert!(sm.try_begin());
        assert!(!sm.try_begin());
        assert_eq!(sm.current(), SessionState::Submitting);

        sm.transition(SessionState::Idle).unwrap();
        assert!(sm.try_begin());
    }

    #[test]
    fn test_invalid_transition_error_message() {
        let sm = StateMachine::new();
        match sm.transition(SessionState::Idle) {
            Err(ChatError::InvalidTransition { from, to }) => {
                assert_eq!(from, "Idle");
                assert_eq!(to, "Idle");
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_reset() {
        let sm = StateMachine::new();
        assert!(sm.try_begin());
        sm.reset();
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_clone_is_shared() {
        let sm1 = StateMachine::new();
        let sm2 = sm1.clone();
        assert!(sm1.try_begin());
        assert_eq!(sm2.current(), SessionState::Submitting);
        assert!(!sm2.try_begin());
    }

    #[test]
    fn test_try_begin_across_threads_admits_one() {
        let sm = StateMachine::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sm = sm.clone();
                std::thread::spawn(move || sm.try_begin())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
