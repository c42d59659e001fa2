//! Domain-specific error types for the winview protocol.
//!
//! Two layers:
//! - [`ValidationError`]: a single payload was malformed. The payload is
//!   discarded and the session keeps running.
//! - [`WinViewError`]: everything else. Fatal to the session it occurs in
//!   (or an API misuse), never to the process.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the winview protocol.
#[derive(Debug, Error)]
pub enum WinViewError {
    // ── Framing Errors ───────────────────────────────────────────
    /// A peer declared a package larger than the configured maximum.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Protocol Errors ──────────────────────────────────────────
    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u8 },

    /// A message violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// A payload failed content validation.
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),

    /// The session has already reported its death.
    #[error("session {0} is closed")]
    SessionClosed(u8),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── ValidationError ──────────────────────────────────────────────

/// Reasons a present payload is rejected.
///
/// Variants are listed in the order the decoder checks them; a payload
/// breaking several rules reports the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The payload ends before the fixed-size header does.
    #[error("payload truncated: need {expected} header bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The sender put another session's id in the payload.
    #[error("client id does not match: expected {expected}, got {actual}")]
    ClientIdMismatch { expected: u8, actual: u8 },

    /// Only `Present` messages are accepted from clients.
    #[error("unsupported message kind {0} (only 0, present, is accepted)")]
    UnsupportedMessageKind(u8),

    /// Only protocol version 0 is understood.
    #[error("unsupported protocol version {0}")]
    UnsupportedProtocolVersion(u8),

    /// The pixel format tag is not one we know.
    #[error("unknown pixel format {0}")]
    UnknownPixelFormat(u8),

    /// The pixel array does not match `width * height * bytes_per_pixel`.
    #[error("invalid pixel array size: expected {expected}, got {actual}")]
    PixelBufferSizeMismatch { expected: usize, actual: usize },

    /// `bytes_per_pixel * 8` disagrees with the pixel format's depth.
    #[error("pixel depth {declared} does not match format depth {expected}")]
    PixelDepthMismatch { declared: u32, expected: u32 },
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for WinViewError {
    fn from(s: String) -> Self {
        WinViewError::Other(s)
    }
}

impl From<&str> for WinViewError {
    fn from(s: &str) -> Self {
        WinViewError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for WinViewError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        WinViewError::ChannelClosed
    }
}
