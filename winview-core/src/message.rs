//! Protocol tags: message kinds, event kinds and pixel formats.
//!
//! Uses proper enums with `TryFrom`; unknown values are errors, not panics.

use crate::error::WinViewError;
use std::fmt;

/// The only protocol version this crate speaks.
pub const PROTOCOL_VERSION: u8 = 0;

// ── ClientMessageKind ────────────────────────────────────────────

/// Kinds of package a client sends to the viewer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMessageKind {
    /// A full window snapshot.
    Present = 0,
}

impl TryFrom<u8> for ClientMessageKind {
    type Error = WinViewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ClientMessageKind::Present),
            _ => Err(WinViewError::UnknownVariant {
                type_name: "ClientMessageKind",
                value,
            }),
        }
    }
}

// ── ServerMessageKind ────────────────────────────────────────────

/// Kinds of package the viewer sends to a client.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMessageKind {
    /// Session handshake carrying the assigned client id.
    Init = 0,
    /// A UI lifecycle event.
    Event = 1,
}

impl TryFrom<u8> for ServerMessageKind {
    type Error = WinViewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ServerMessageKind::Init),
            1 => Ok(ServerMessageKind::Event),
            _ => Err(WinViewError::UnknownVariant {
                type_name: "ServerMessageKind",
                value,
            }),
        }
    }
}

// ── EventKind ────────────────────────────────────────────────────

/// UI events forwarded from the viewer window to the client.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The viewer window was asked to close.
    Close = 0,
    /// The viewer window changed size.
    Resize = 1,
}

impl TryFrom<u8> for EventKind {
    type Error = WinViewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventKind::Close),
            1 => Ok(EventKind::Resize),
            _ => Err(WinViewError::UnknownVariant {
                type_name: "EventKind",
                value,
            }),
        }
    }
}

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of a presented frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 1 byte per pixel, luminance.
    Grayscale8 = 0,
    /// 4 bytes per pixel, alpha/red/green/blue.
    Argb32 = 1,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> u8 {
        match self {
            PixelFormat::Grayscale8 => 1,
            PixelFormat::Argb32 => 4,
        }
    }

    /// Canonical bit depth of this format.
    pub const fn bit_depth(self) -> u32 {
        self.bytes_per_pixel() as u32 * 8
    }
}

impl TryFrom<u8> for PixelFormat {
    type Error = WinViewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PixelFormat::Grayscale8),
            1 => Ok(PixelFormat::Argb32),
            _ => Err(WinViewError::UnknownVariant {
                type_name: "PixelFormat",
                value,
            }),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Grayscale8 => write!(f, "Grayscale8"),
            PixelFormat::Argb32 => write!(f, "Argb32"),
        }
    }
}
