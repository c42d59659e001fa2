//! Byte-level wire plumbing: integer byte order and package framing.

pub mod byte_order;
pub mod framer;

pub use byte_order::WireInt;
pub use framer::{
    DEFAULT_MAX_PAYLOAD, FramerState, LENGTH_PREFIX_SIZE, PackageCodec, PackageFramer, Packages,
    frame_package,
};
