//! Session lifecycle state machine.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::WinViewError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a viewer-side session.
///
/// ```text
///  Handshaking ──► Active ──► Closed
///       │                       ▲
///       └───────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Accepted; the Init package has not been written yet.
    #[default]
    Handshaking,

    /// Init delivered; presents are decoded and events may be sent.
    Active {
        /// When the session entered the `Active` state.
        since: Instant,
    },

    /// Terminal. The dead notification has been raised.
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Active { .. } => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the session has been active. `None` in any other phase.
    pub fn active_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Active { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Active`.
    ///
    /// Valid from: `Handshaking`.
    pub fn activate(&mut self) -> Result<(), WinViewError> {
        match self {
            Self::Handshaking => {
                *self = Self::Active {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(WinViewError::ProtocolViolation(
                "cannot activate: not in Handshaking state",
            )),
        }
    }

    /// Transition to `Closed`.
    ///
    /// Valid from: `Handshaking` (handshake write failed), `Active`.
    pub fn close(&mut self) -> Result<(), WinViewError> {
        match self {
            Self::Handshaking | Self::Active { .. } => {
                *self = Self::Closed;
                Ok(())
            }
            Self::Closed => Err(WinViewError::ProtocolViolation(
                "cannot close: already Closed",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
