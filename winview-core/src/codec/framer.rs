//! Length-prefixed package framing.
//!
//! Every package on the wire, in both directions, is:
//!
//! ```text
//! length:  u32 BE  (4)   payload byte count, prefix excluded
//! payload: [u8]    (length)
//! ```
//!
//! [`PackageCodec`] is the two-state demultiplexer and plugs into
//! `tokio_util::codec::Framed`. [`PackageFramer`] owns its own buffer for
//! callers that are handed raw chunks (the session handler).

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::byte_order::{self, WireInt};
use crate::error::WinViewError;

// ── Constants ────────────────────────────────────────────────────

/// Size of the length prefix in front of every package.
pub const LENGTH_PREFIX_SIZE: usize = <u32 as WireInt>::WIDTH;

/// Default cap on a single package (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: u32 = 64 * 1024 * 1024;

// ── FramerState ──────────────────────────────────────────────────

/// Where the framer is inside the current package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerState {
    /// Waiting for the 4-byte length prefix.
    #[default]
    AwaitingLength,
    /// Prefix consumed; waiting for this many payload bytes.
    AwaitingPayload(u32),
}

// ── PackageCodec ─────────────────────────────────────────────────

/// Stream demultiplexer for winview packages.
///
/// The declared length is consumed once per package and cleared only after
/// the full payload has been split off, so a payload that later fails
/// validation never disturbs the framing of the packages after it.
#[derive(Debug, Clone)]
pub struct PackageCodec {
    state: FramerState,
    max_payload: u32,
}

impl PackageCodec {
    /// Create a codec with [`DEFAULT_MAX_PAYLOAD`].
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a codec rejecting packages longer than `max_payload`.
    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            state: FramerState::AwaitingLength,
            max_payload,
        }
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn max_payload(&self) -> u32 {
        self.max_payload
    }

    fn check_len(&self, len: usize) -> Result<(), WinViewError> {
        if len > self.max_payload as usize {
            return Err(WinViewError::PayloadTooLarge {
                size: len,
                max: self.max_payload as usize,
            });
        }
        Ok(())
    }
}

impl Default for PackageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PackageCodec {
    type Item = Bytes;
    type Error = WinViewError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                FramerState::AwaitingLength => {
                    if src.len() < LENGTH_PREFIX_SIZE {
                        return Ok(None);
                    }
                    let declared: u32 = byte_order::decode(&src[..LENGTH_PREFIX_SIZE]);
                    // Leave the prefix in place: a rejected length keeps failing.
                    self.check_len(declared as usize)?;
                    // Buffer growth follows the bytes that actually arrive.
                    src.advance(LENGTH_PREFIX_SIZE);
                    self.state = FramerState::AwaitingPayload(declared);
                }
                FramerState::AwaitingPayload(declared) => {
                    let declared = declared as usize;
                    if src.len() < declared {
                        return Ok(None);
                    }
                    let payload = src.split_to(declared).freeze();
                    self.state = FramerState::AwaitingLength;
                    return Ok(Some(payload));
                }
            }
        }
    }
}

impl Encoder<Bytes> for PackageCodec {
    type Error = WinViewError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.check_len(item.len())?;
        dst.reserve(LENGTH_PREFIX_SIZE + item.len());
        byte_order::encode(item.len() as u32, dst);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

/// Prepend the length prefix to an outgoing payload.
pub fn frame_package(payload: &[u8]) -> Result<Bytes, WinViewError> {
    let len = u32::try_from(payload.len()).map_err(|_| WinViewError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut out = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    byte_order::encode(len, &mut out);
    out.extend_from_slice(payload);
    Ok(out.freeze())
}

// ── PackageFramer ────────────────────────────────────────────────

/// A [`PackageCodec`] with its own accumulation buffer.
///
/// ```ignore
/// let mut framer = PackageFramer::new();
/// for package in framer.feed(&chunk) {
///     handle(package?);
/// }
/// ```
#[derive(Debug, Default)]
pub struct PackageFramer {
    codec: PackageCodec,
    buffer: BytesMut,
}

impl PackageFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            codec: PackageCodec::with_max_payload(max_payload),
            buffer: BytesMut::new(),
        }
    }

    pub fn state(&self) -> FramerState {
        self.codec.state()
    }

    pub fn max_payload(&self) -> u32 {
        self.codec.max_payload()
    }

    /// Bytes held for the current package (length prefix excluded once consumed).
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a chunk and iterate over every package it completes.
    ///
    /// The iterator is lazy: packages not pulled stay buffered and come out
    /// of the next `feed`. It stops after the first error.
    pub fn feed(&mut self, chunk: &[u8]) -> Packages<'_> {
        self.buffer.extend_from_slice(chunk);
        Packages {
            framer: self,
            done: false,
        }
    }

    /// Extract the next complete package, if one is buffered.
    pub fn next_package(&mut self) -> Result<Option<Bytes>, WinViewError> {
        self.codec.decode(&mut self.buffer)
    }
}

/// Iterator returned by [`PackageFramer::feed`].
#[derive(Debug)]
pub struct Packages<'a> {
    framer: &'a mut PackageFramer,
    done: bool,
}

impl Iterator for Packages<'_> {
    type Item = Result<Bytes, WinViewError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.framer.next_package() {
            Ok(Some(package)) => Some(Ok(package)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
