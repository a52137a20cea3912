// State management module
//
// This module provides the StateManager which wraps the scan session snapshot with
// thread-safe access using Arc<RwLock<T>> and emits change events for feedback updates.

use crate::models::{SessionSnapshot, SessionState};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted when the session snapshot is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Session moved between states
    StateTransition {
        from: SessionState,
        to: SessionState,
    },

    /// Page visibility flipped
    VisibilityChanged {
        hidden: bool,
    },

    /// A decoded code was accepted for lookup
    CodeAccepted {
        code: String,
    },

    /// Manual entry became available
    ManualEntryActivated,

    /// Session was torn down
    StateReset,
}

/// Rejected state machine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

/// Thread-safe session state manager with event emission
///
/// - Provides access to [`SessionSnapshot`] via `Arc<RwLock<T>>`
/// - Detects changes and emits [`StateChange`] events
/// - Guards transitions: [`transition()`](Self::transition) checks and moves in one write lock,
///   which is what keeps a second lookup from starting while one is in flight
///
/// # Related Types
///
/// - [`crate::ui::ScanSession`]: the only component that moves the state
/// - [`crate::models::SessionState`]: the states and their meaning
pub struct StateManager {
    state: Arc<RwLock<SessionSnapshot>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager in `Idle`
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionSnapshot::default())),
            state_tx,
        }
    }

    /// Get a copy of the current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().unwrap().clone()
    }

    /// Current session state
    pub fn current(&self) -> SessionState {
        self.state.read().unwrap().state
    }

    /// Execute a function with read access to the snapshot
    ///
    /// # Example
    /// ```ignore
    /// let hidden = state_manager.read(|s| s.page_hidden);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionSnapshot) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the snapshot and emit change events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        self.emit(&changes);
        changes
    }

    /// Move to `to` if the current state is one of `allowed_from`
    ///
    /// The check and the move happen under one write lock. On mismatch nothing changes.
    pub fn transition(
        &self,
        allowed_from: &[SessionState],
        to: SessionState,
    ) -> Result<Vec<StateChange>, SessionError> {
        let mut state = self.state.write().unwrap();
        let from = state.state;

        if !allowed_from.contains(&from) {
            return Err(SessionError::InvalidTransition { from, to });
        }

        let old_state = state.clone();
        state.state = to;

        let changes = Self::detect_changes(&old_state, &state);
        self.emit(&changes);

        tracing::debug!("Session {} -> {}", from, to);
        Ok(changes)
    }

    /// Accept a decoded code: `Scanning -> Paused` and remember the code
    pub fn accept_code(&self, code: &str) -> Result<Vec<StateChange>, SessionError> {
        let mut state = self.state.write().unwrap();
        let from = state.state;

        if from != SessionState::Scanning {
            return Err(SessionError::InvalidTransition {
                from,
                to: SessionState::Paused,
            });
        }

        let old_state = state.clone();
        state.state = SessionState::Paused;
        state.last_code = Some(code.to_string());

        let mut changes = Self::detect_changes(&old_state, &state);
        changes.push(StateChange::CodeAccepted {
            code: code.to_string(),
        });
        self.emit(&changes);

        Ok(changes)
    }

    /// Record a finished lookup and move `LookupInFlight -> Error`
    pub fn fail_lookup(&self) -> Result<Vec<StateChange>, SessionError> {
        let mut state = self.state.write().unwrap();
        let from = state.state;

        if from != SessionState::LookupInFlight {
            return Err(SessionError::InvalidTransition {
                from,
                to: SessionState::Error,
            });
        }

        let old_state = state.clone();
        state.state = SessionState::Error;
        state.last_code = None;
        state.lookups_completed += 1;

        let changes = Self::detect_changes(&old_state, &state);
        self.emit(&changes);
        Ok(changes)
    }

    /// Set the page visibility flag
    pub fn set_page_hidden(&self, hidden: bool) -> Vec<StateChange> {
        self.update(|state| state.page_hidden = hidden)
    }

    /// Mark manual entry as available
    pub fn activate_manual_entry(&self) -> Vec<StateChange> {
        self.update(|state| state.manual_entry_active = true)
    }

    /// Return to `Idle`, keeping only whether manual entry is available
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            let manual_entry_active = state.manual_entry_active;
            let lookups_completed = state.lookups_completed;
            *state = SessionSnapshot {
                manual_entry_active,
                lookups_completed,
                ..Default::default()
            };
        });

        let _ = self.state_tx.send(StateChange::StateReset);
        changes.push(StateChange::StateReset);
        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, changes: &[StateChange]) {
        for change in changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }
    }

    fn detect_changes(old: &SessionSnapshot, new: &SessionSnapshot) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.state != new.state {
            changes.push(StateChange::StateTransition {
                from: old.state,
                to: new.state,
            });
        }

        if old.page_hidden != new.page_hidden {
            changes.push(StateChange::VisibilityChanged {
                hidden: new.page_hidden,
            });
        }

        if !old.manual_entry_active && new.manual_entry_active {
            changes.push(StateChange::ManualEntryActivated);
        }

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
