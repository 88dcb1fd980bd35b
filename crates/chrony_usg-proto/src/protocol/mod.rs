//! Types and constants of chronyd's command protocol.
//!
//! Provides buffer-based [`FromBytes`]/[`ToBytes`] implementations for every
//! wire type and, with the `std` feature, `ReadBytes` and `WriteBytes`
//! implementations which extend the byteorder crate's `ReadBytesExt` and
//! `WriteBytesExt` traits.

/// Default UDP port of the command socket.
pub const PORT: u16 = 323;

/// Default address of the command socket.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:323";

/// Default path of the command socket for local Unix datagram access.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/chrony/chronyd.sock";

/// Largest reply datagram a client needs to accept.
pub const MAX_REPLY_SIZE: usize = 10240;

mod bytes;
#[cfg(feature = "std")]
mod io;
mod traits;
mod types;

pub use self::traits::*;
pub use self::types::*;
