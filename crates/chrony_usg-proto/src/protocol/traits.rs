#[cfg(feature = "std")]
use byteorder::{ReadBytesExt, WriteBytesExt};
#[cfg(feature = "std")]
use std::io;

use crate::error::ParseError;

/// Write a request, reply header or payload to any byteorder writer.
///
/// Blanket-implemented for every `byteorder::WriteBytesExt`, so a `Vec<u8>`,
/// a `&mut [u8]` or a socket adapter can take a [`RequestPacket`] directly.
/// Requires the `std` feature.
///
/// [`RequestPacket`]: super::RequestPacket
#[cfg(feature = "std")]
pub trait WriteBytes {
    /// Write `protocol` in network byte order.
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()>;
}

/// Read a request, reply header or payload from any byteorder reader.
///
/// Blanket-implemented for every `byteorder::ReadBytesExt`. A reader that
/// ends early yields `io::ErrorKind::UnexpectedEof`; use [`FromBytes`] when
/// the exact shortfall matters. Requires the `std` feature.
#[cfg(feature = "std")]
pub trait ReadBytes {
    /// Read one value in network byte order.
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P>;
}

/// Wire types with a byteorder encoder. Requires the `std` feature.
#[cfg(feature = "std")]
pub trait WriteToBytes {
    /// Encode into `writer`. Requests include their zero padding.
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()>;
}

/// Wire types with a byteorder decoder. Requires the `std` feature.
#[cfg(feature = "std")]
pub trait ReadFromBytes: Sized {
    /// Decode from `reader`, consuming exactly the type's packed size.
    fn read_from_bytes<R: ReadBytesExt>(reader: R) -> io::Result<Self>;
}

/// Wire types whose encoding has a fixed length: 408 bytes for a request,
/// 28 for a reply header, and the per-command sizes of the reply bodies.
pub trait ConstPackedSizeBytes {
    /// Encoded length in bytes.
    const PACKED_SIZE_BYTES: usize;
}

/// Decode from the front of a byte slice.
///
/// This is the codec the client's correlator uses: it needs no allocator
/// or `std::io`, and a short buffer reports how many bytes were missing
/// through [`ParseError::BufferTooShort`].
pub trait FromBytes: Sized {
    /// Decode from `buf`, returning the value and the number of bytes
    /// consumed. Trailing bytes are left for the caller.
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError>;
}

/// Encode into the front of a byte slice.
pub trait ToBytes {
    /// Encode into `buf`, returning the number of bytes written. Fails with
    /// [`ParseError::BufferTooShort`] if `buf` is too short.
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError>;
}
