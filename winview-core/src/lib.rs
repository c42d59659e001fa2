//! # winview-core
//!
//! Wire protocol engine for streaming window snapshots from a remote
//! process to a viewer and sending UI events back.
//!
//! This crate contains:
//! - **Codec**: big-endian integer helpers and the length-prefix `PackageCodec`
//! - **Frame**: `decode_present` / `encode_present` with ordered validation
//! - **Control**: `ControlMessage` (Init handshake, Close/Resize events)
//! - **Session**: the per-connection `Session` state machine and its observer
//! - **Network**: `SessionConnection`, a tokio task driving one session
//! - **Client**: `WinClient`, the peer side of the protocol
//! - **Error**: `WinViewError` / `ValidationError`, `thiserror`-based

pub mod client;
pub mod codec;
pub mod control;
pub mod error;
pub mod frame;
pub mod message;
pub mod network;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::WinClient;
pub use codec::{DEFAULT_MAX_PAYLOAD, PackageCodec, PackageFramer, frame_package};
pub use control::{ControlMessage, UiEvent};
pub use error::{ValidationError, WinViewError};
pub use frame::{Frame, PresentHeader, decode_present, encode_present};
pub use message::{
    ClientMessageKind, EventKind, PROTOCOL_VERSION, PixelFormat, ServerMessageKind,
};
pub use network::{SessionConfig, SessionConnection, SessionHandle};
pub use session::{Session, SessionEvent, SessionObserver, SessionPhase};
