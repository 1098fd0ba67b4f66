//! Lifecycle state of a protocol session.
//!
//! ```text
//! initialize ──► CREATED ──start──► STARTED ──close──► CLOSED
//!                   │                                    ▲
//!                   └───────────────close────────────────┘
//! ```
//!
//! Measurement points may only be declared while `Created`, samples may only be
//! injected while `Started`, and `Closed` is terminal.

use std::fmt;

/// Represents where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initialized; measurement points can still be declared.
    Created,

    /// Header sent; the schema mapping is frozen and samples are accepted.
    Started,

    /// Sink released. Every further operation except `close` fails.
    Closed,
}

impl SessionState {
    /// Returns the protocol-level name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "CREATED",
            SessionState::Started => "STARTED",
            SessionState::Closed => "CLOSED",
        }
    }

    /// True while measurement points may be declared.
    pub fn accepts_declarations(&self) -> bool {
        matches!(self, SessionState::Created)
    }

    /// True while samples may be injected.
    pub fn accepts_injections(&self) -> bool {
        matches!(self, SessionState::Started)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_as_str() {
        assert_eq!(SessionState::Created.as_str(), "CREATED");
        assert_eq!(SessionState::Started.as_str(), "STARTED");
        assert_eq!(SessionState::Closed.as_str(), "CLOSED");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Started.to_string(), "STARTED");
    }

    #[test]
    fn test_declarations_only_while_created() {
        assert!(SessionState::Created.accepts_declarations());
        assert!(!SessionState::Started.accepts_declarations());
        assert!(!SessionState::Closed.accepts_declarations());
    }

    #[test]
    fn test_injections_only_while_started() {
        assert!(!SessionState::Created.accepts_injections());
        assert!(SessionState::Started.accepts_injections());
        assert!(!SessionState::Closed.accepts_injections());
    }

    #[test]
    fn test_is_closed() {
        assert!(SessionState::Closed.is_closed());
        assert!(!SessionState::Created.is_closed());
    }
}
