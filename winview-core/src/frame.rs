//! Present messages and the frames decoded from them.
//!
//! ## Wire format
//!
//! **Present payload** (9 byte header + pixels):
//! ```text
//! protocol_version: u8   (1)   must be 0
//! client_id:        u8   (1)   must match the session
//! message_kind:     u8   (1)   must be 0 (present)
//! pixel_format:     u8   (1)   0 = Grayscale8, 1 = Argb32
//! bytes_per_pixel:  u8   (1)
//! width:            u16  (2)
//! height:           u16  (2)
//! pixels:           [u8] (width * height * bytes_per_pixel), row-major, unpadded
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::byte_order;
use crate::error::ValidationError;
use crate::message::{ClientMessageKind, PROTOCOL_VERSION, PixelFormat};

// ── PresentHeader ────────────────────────────────────────────────

/// The fixed-size head of a present payload, fields taken as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentHeader {
    pub protocol_version: u8,
    pub client_id: u8,
    pub message_kind: u8,
    pub pixel_format: u8,
    pub bytes_per_pixel: u8,
    pub width: u16,
    pub height: u16,
}

impl PresentHeader {
    /// Encoded size on the wire.
    pub const SIZE: usize = 9;

    /// Header for a well-formed present from `client_id`.
    pub fn new(client_id: u8, format: PixelFormat, width: u16, height: u16) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            client_id,
            message_kind: ClientMessageKind::Present as u8,
            pixel_format: format as u8,
            bytes_per_pixel: format.bytes_per_pixel(),
            width,
            height,
        }
    }

    /// Pixel bytes this header announces.
    pub fn pixel_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.bytes_per_pixel as u64
    }

    /// Serialize to `dst` (big-endian).
    pub fn encode(&self, dst: &mut impl BufMut) {
        byte_order::encode(self.protocol_version, dst);
        byte_order::encode(self.client_id, dst);
        byte_order::encode(self.message_kind, dst);
        byte_order::encode(self.pixel_format, dst);
        byte_order::encode(self.bytes_per_pixel, dst);
        byte_order::encode(self.width, dst);
        byte_order::encode(self.height, dst);
    }

    /// Deserialize from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, ValidationError> {
        if data.len() < Self::SIZE {
            return Err(ValidationError::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            protocol_version: data[0],
            client_id: data[1],
            message_kind: data[2],
            pixel_format: data[3],
            bytes_per_pixel: data[4],
            width: byte_order::decode(&data[5..7]),
            height: byte_order::decode(&data[7..9]),
        })
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// A validated window snapshot.
///
/// Frames produced by [`decode_present`] satisfy
/// `pixels.len() == width * height * bytes_per_pixel` and
/// `bytes_per_pixel * 8 == pixel_format.bit_depth()`. The fields are public,
/// so a frame built by hand carries no such guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub protocol_version: u8,
    pub pixel_format: PixelFormat,
    pub bytes_per_pixel: u8,
    pub width: u16,
    pub height: u16,
    /// Owned copy of the pixel rows.
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Returns row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u16) -> &[u8] {
        let start = y as usize * self.stride();
        &self.pixels[start..start + self.stride()]
    }
}

// ── Decoding ─────────────────────────────────────────────────────

/// Validate a present payload sent on session `session_id` and build a [`Frame`].
///
/// Checks run in a fixed order and stop at the first failure: header
/// length, client id, message kind, protocol version, pixel format, pixel
/// buffer size, pixel depth. Nothing is applied on failure.
pub fn decode_present(payload: &[u8], session_id: u8) -> Result<Frame, ValidationError> {
    let header = PresentHeader::decode(payload)?;
    let pixels = &payload[PresentHeader::SIZE..];

    if header.client_id != session_id {
        return Err(ValidationError::ClientIdMismatch {
            expected: session_id,
            actual: header.client_id,
        });
    }
    if ClientMessageKind::try_from(header.message_kind).is_err() {
        return Err(ValidationError::UnsupportedMessageKind(header.message_kind));
    }
    if header.protocol_version != PROTOCOL_VERSION {
        return Err(ValidationError::UnsupportedProtocolVersion(
            header.protocol_version,
        ));
    }
    let format = PixelFormat::try_from(header.pixel_format)
        .map_err(|_| ValidationError::UnknownPixelFormat(header.pixel_format))?;

    let expected = header.pixel_len();
    if pixels.len() as u64 != expected {
        return Err(ValidationError::PixelBufferSizeMismatch {
            expected: usize::try_from(expected).unwrap_or(usize::MAX),
            actual: pixels.len(),
        });
    }

    let declared = header.bytes_per_pixel as u32 * 8;
    if declared != format.bit_depth() {
        return Err(ValidationError::PixelDepthMismatch {
            declared,
            expected: format.bit_depth(),
        });
    }

    Ok(Frame {
        protocol_version: header.protocol_version,
        pixel_format: format,
        bytes_per_pixel: header.bytes_per_pixel,
        width: header.width,
        height: header.height,
        pixels: pixels.to_vec(),
    })
}

// ── Encoding ─────────────────────────────────────────────────────

/// Build a present payload (without the length prefix).
///
/// Refuses pixel buffers whose size disagrees with the dimensions, so a
/// well-behaved client never sends something the viewer will discard.
pub fn encode_present(
    client_id: u8,
    format: PixelFormat,
    width: u16,
    height: u16,
    pixels: &[u8],
) -> Result<Bytes, ValidationError> {
    let header = PresentHeader::new(client_id, format, width, height);
    if pixels.len() as u64 != header.pixel_len() {
        return Err(ValidationError::PixelBufferSizeMismatch {
            expected: usize::try_from(header.pixel_len()).unwrap_or(usize::MAX),
            actual: pixels.len(),
        });
    }

    let mut out = BytesMut::with_capacity(PresentHeader::SIZE + pixels.len());
    header.encode(&mut out);
    out.extend_from_slice(pixels);
    Ok(out.freeze())
}

// ── Tests ────────────────────────────────────────────────────────
