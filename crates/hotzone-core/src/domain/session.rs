//! Session lifecycle states.
//!
//! ```text
//! Absent ──► Connecting ──► Handshaking ──► Ready
//!                │               │
//!                └──► Failed ◄───┘
//! ```
//!
//! `Ready` and `Failed` are terminal for a session instance.  Recovering from
//! either means starting a new session from `Absent`; a finished session is
//! never moved back to `Connecting`.

use std::fmt;

use thiserror::Error;

/// Where a session is in its lifecycle.
///
/// The negotiated RPC version lives inside `Ready`, so a ready state without a
/// negotiated version cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection has been attempted for this session yet.
    Absent,
    /// Transport connection in progress.
    Connecting,
    /// Transport open; Hello/Identify/Identified exchange in progress.
    Handshaking,
    /// Handshake complete; commands may be sent.
    Ready {
        /// RPC version confirmed by the peer in its Identified message.
        negotiated_rpc_version: u32,
    },
    /// Connection or handshake failed.
    Failed,
}

/// An attempted move that the lifecycle does not allow.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal session transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionState,
    pub to: SessionState,
}

impl SessionState {
    /// Returns `true` only for [`SessionState::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready { .. })
    }

    /// Returns `true` for states a session can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Ready { .. } | SessionState::Failed)
    }

    /// The negotiated RPC version, present only once ready.
    pub fn negotiated_rpc_version(&self) -> Option<u32> {
        match self {
            SessionState::Ready {
                negotiated_rpc_version,
            } => Some(*negotiated_rpc_version),
            _ => None,
        }
    }

    /// Moves to `next` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for any move not in the diagram above,
    /// including every move out of a terminal state.
    pub fn transition(self, next: SessionState) -> Result<SessionState, TransitionError> {
        use SessionState::*;

        let allowed = matches!(
            (self, next),
            (Absent, Connecting)
                | (Connecting, Handshaking)
                | (Connecting, Failed)
                | (Handshaking, Ready { .. })
                | (Handshaking, Failed)
        );

        if allowed {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Absent => f.write_str("absent"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Handshaking => f.write_str("handshaking"),
            SessionState::Ready {
                negotiated_rpc_version,
            } => write!(f, "ready (rpc v{negotiated_rpc_version})"),
            SessionState::Failed => f.write_str("failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const READY: SessionState = SessionState::Ready {
        negotiated_rpc_version: 1,
    };

    #[test]
    fn test_happy_path_transitions_are_allowed() {
        let state = SessionState::Absent
            .transition(SessionState::Connecting)
            .and_then(|s| s.transition(SessionState::Handshaking))
            .and_then(|s| s.transition(READY))
            .unwrap();

        assert_eq!(state.negotiated_rpc_version(), Some(1));
        assert!(state.is_ready());
    }

    #[test]
    fn test_failure_reachable_from_connecting_and_handshaking() {
        assert_eq!(
            SessionState::Connecting.transition(SessionState::Failed),
            Ok(SessionState::Failed)
        );
        assert_eq!(
            SessionState::Handshaking.transition(SessionState::Failed),
            Ok(SessionState::Failed)
        );
    }

    #[test]
    fn test_terminal_states_cannot_restart() {
        assert!(SessionState::Failed
            .transition(SessionState::Connecting)
            .is_err());
        assert!(READY.transition(SessionState::Connecting).is_err());
        assert!(READY.transition(SessionState::Failed).is_err());
    }

    #[test]
    fn test_ready_cannot_be_reached_without_handshake() {
        let err = SessionState::Connecting.transition(READY).unwrap_err();
        assert_eq!(err.from, SessionState::Connecting);
        assert_eq!(err.to, READY);
    }

    #[test]
    fn test_failure_not_reachable_from_absent() {
        assert!(SessionState::Absent
            .transition(SessionState::Failed)
            .is_err());
    }

    #[test]
    fn test_only_ready_and_failed_are_terminal() {
        assert!(READY.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Absent.is_terminal());
        assert!(!SessionState::Connecting.is_terminal());
        assert!(!SessionState::Handshaking.is_terminal());
    }

    #[test]
    fn test_non_ready_states_have_no_negotiated_version() {
        assert_eq!(SessionState::Handshaking.negotiated_rpc_version(), None);
        assert_eq!(SessionState::Failed.negotiated_rpc_version(), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SessionState::Handshaking.to_string(), "handshaking");
        assert_eq!(READY.to_string(), "ready (rpc v1)");
    }
}
