//! Viewer-to-client control messages.
//!
//! ## Wire format
//!
//! ```text
//! Init:   kind=0 u8 | client_id u8
//! Event:  kind=1 u8 | event_kind u8 | fields
//!           Close  (0): no fields
//!           Resize (1): width u16 | height u16
//! ```

use bytes::{Bytes, BytesMut};

use crate::codec::byte_order::{self, WireInt};
use crate::error::WinViewError;
use crate::message::{EventKind, ServerMessageKind};

// ── UiEvent ──────────────────────────────────────────────────────

/// A viewer window event forwarded to the client that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// The user asked to close the window.
    Close,
    /// The window now has this size in pixels.
    Resize { width: u16, height: u16 },
}

impl UiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UiEvent::Close => EventKind::Close,
            UiEvent::Resize { .. } => EventKind::Resize,
        }
    }
}

// ── ControlMessage ───────────────────────────────────────────────

/// Everything the viewer can send to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Handshake: tells the client which id to stamp on its presents.
    Init { client_id: u8 },
    /// A UI event.
    Event(UiEvent),
}

impl ControlMessage {
    /// Build the payload (without the length prefix).
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(6);
        match self {
            ControlMessage::Init { client_id } => {
                byte_order::encode(ServerMessageKind::Init as u8, &mut out);
                byte_order::encode(*client_id, &mut out);
            }
            ControlMessage::Event(event) => {
                byte_order::encode(ServerMessageKind::Event as u8, &mut out);
                byte_order::encode(event.kind() as u8, &mut out);
                if let UiEvent::Resize { width, height } = event {
                    byte_order::encode(*width, &mut out);
                    byte_order::encode(*height, &mut out);
                }
            }
        }
        out.freeze()
    }

    /// Parse a payload received from the viewer.
    pub fn decode(payload: &[u8]) -> Result<Self, WinViewError> {
        let (&kind, rest) = payload
            .split_first()
            .ok_or(WinViewError::ProtocolViolation("empty control payload"))?;

        match ServerMessageKind::try_from(kind)? {
            ServerMessageKind::Init => match rest {
                [client_id] => Ok(ControlMessage::Init {
                    client_id: *client_id,
                }),
                _ => Err(WinViewError::ProtocolViolation(
                    "init payload must be exactly 2 bytes",
                )),
            },
            ServerMessageKind::Event => {
                let (&event_kind, fields) = rest
                    .split_first()
                    .ok_or(WinViewError::ProtocolViolation("event payload without kind"))?;
                let event = match EventKind::try_from(event_kind)? {
                    EventKind::Close => UiEvent::Close,
                    EventKind::Resize => {
                        if fields.len() < 2 * <u16 as WireInt>::WIDTH {
                            return Err(WinViewError::ProtocolViolation(
                                "resize event truncated",
                            ));
                        }
                        UiEvent::Resize {
                            width: byte_order::decode(&fields[0..2]),
                            height: byte_order::decode(&fields[2..4]),
                        }
                    }
                };
                Ok(ControlMessage::Event(event))
            }
        }
    }
}
