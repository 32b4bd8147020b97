//! Lifecycle of one relayed session.

use std::fmt;

/// `Connecting → Registered → Relaying → Disconnecting → Closed`
///
/// `Closed` is terminal and entered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Registered,
    Relaying,
    Disconnecting,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Connecting, Registered)
                // A duplicate key closes the connection before it is registered.
                | (Connecting, Closed)
                | (Registered, Relaying)
                | (Registered, Disconnecting)
                | (Relaying, Relaying)
                | (Relaying, Disconnecting)
                | (Disconnecting, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Registered => "registered",
            SessionState::Relaying => "relaying",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one session and logs every transition
#[derive(Debug)]
pub(crate) struct Lifecycle {
    /// Key as it may appear in logs
    key: String,
    state: SessionState,
}

impl Lifecycle {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: SessionState::Connecting,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                key = %self.key,
                "Unexpected session transition {} -> {}",
                self.state,
                next
            );
        }
        tracing::debug!(key = %self.key, "Session {} -> {}", self.state, next);
        self.state = next;
    }
}
