//! Fixed-width integer encoding.
//!
//! Every integer on the winview wire is big-endian, whatever the host's
//! native order is.

use bytes::BufMut;

/// An integer type that can travel on the wire.
pub trait WireInt: Copy + Sized {
    /// Encoded size in bytes.
    const WIDTH: usize;

    /// Append the big-endian representation to `dst`.
    fn put_be(self, dst: &mut impl BufMut);

    /// Read from the first [`WIDTH`](Self::WIDTH) bytes of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is shorter than `WIDTH`.
    fn from_be_slice(src: &[u8]) -> Self;
}

macro_rules! impl_wire_int {
    ($($t:ty),*) => {$(
        impl WireInt for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn put_be(self, dst: &mut impl BufMut) {
                dst.put_slice(&self.to_be_bytes());
            }

            fn from_be_slice(src: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&src[..Self::WIDTH]);
                <$t>::from_be_bytes(raw)
            }
        }
    )*};
}

impl_wire_int!(u8, u16, u32);

/// Append `value` to `dst` in big-endian order.
pub fn encode<T: WireInt>(value: T, dst: &mut impl BufMut) {
    value.put_be(dst);
}

/// Decode a big-endian `T` from the start of `src`.
///
/// # Panics
///
/// Panics if `src.len() < T::WIDTH`; callers check lengths first.
pub fn decode<T: WireInt>(src: &[u8]) -> T {
    T::from_be_slice(src)
}
