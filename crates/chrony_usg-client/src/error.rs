// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for the chrony command client.
//!
//! Every fallible client operation returns [`ChronyError`]. Callers that work
//! in terms of `io::Result` can convert with `?` and still match on the typed
//! error by downcasting through `io::Error::get_ref()`:
//!
//! ```no_run
//! use chrony_client::ChronyClient;
//! use chrony_client::error::{ChronyError, TransportError};
//!
//! fn stratum() -> std::io::Result<u16> {
//!     let mut client = ChronyClient::builder().connect()?;
//!     Ok(client.fetch_tracking()?.stratum)
//! }
//!
//! if let Err(e) = stratum() {
//!     match e.get_ref().and_then(|inner| inner.downcast_ref::<ChronyError>()) {
//!         Some(ChronyError::Transport(TransportError::Timeout)) => eprintln!("chronyd did not answer"),
//!         Some(other) => eprintln!("chrony error: {other}"),
//!         None => eprintln!("{e}"),
//!     }
//! }
//! ```

pub use chrony_proto::error::ParseError;

use std::fmt;
use std::io;

use chrony_proto::protocol::{Command, PacketType, ProtocolVersion, ReplyHeader, Status};

use crate::config::TransportKind;

/// Errors that can occur during chrony client operations.
#[derive(Debug)]
pub enum ChronyError {
    /// The datagram channel failed or is not usable.
    Transport(TransportError),
    /// A reply arrived but does not answer the request that was sent.
    Protocol(ProtocolViolation),
    /// A reply body is shorter than its layout requires.
    Decode(ParseError),
    /// No protocol revision could be agreed with the daemon.
    Negotiation(NegotiationError),
    /// Invalid client configuration.
    Config(ConfigError),
}

/// Datagram channel errors.
#[derive(Debug)]
pub enum TransportError {
    /// The client has not been connected.
    NotConnected,
    /// The client has been closed.
    Closed,
    /// Opening the channel failed.
    Connect(io::Error),
    /// Sending the request failed.
    Send(io::Error),
    /// The request was not written as a single complete datagram.
    ShortWrite {
        /// Bytes accepted by the socket.
        written: usize,
        /// Size of the request.
        expected: usize,
    },
    /// Receiving the reply failed.
    Recv(io::Error),
    /// No reply arrived within the configured timeout.
    Timeout,
}

/// A reply that failed validation, with the header that was decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct ProtocolViolation {
    /// Which check failed.
    pub error: ProtocolError,
    /// Header of the offending reply.
    pub header: ReplyHeader,
    /// Undecoded body, attached for replies to commands without a known layout.
    pub payload: Option<Vec<u8>>,
}

/// Reply validation failures, in the order they are checked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolError {
    /// The reply's sequence number is not the request's.
    SequenceMismatch {
        /// Sequence number of the request.
        expected: u32,
        /// Sequence number echoed in the reply.
        actual: u32,
    },
    /// The reply's protocol revision is not the request's.
    VersionMismatch {
        /// Revision of the request.
        expected: ProtocolVersion,
        /// Revision of the reply.
        actual: ProtocolVersion,
    },
    /// The packet is not a reply.
    UnexpectedPacketType {
        /// Packet type found in the header.
        actual: PacketType,
    },
    /// The daemon reported a failure status.
    DaemonStatus {
        /// Status found in the header.
        status: Status,
    },
    /// The reply is for a command this client has no layout for.
    UnexpectedCommand {
        /// Command echoed in the reply.
        command: Command,
    },
}

/// Protocol revision negotiation errors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NegotiationError {
    /// No candidate revision was accepted by the daemon.
    Unsupported {
        /// Revisions probed, in order.
        tried: Vec<ProtocolVersion>,
    },
    /// A typed request was built before a revision was negotiated.
    NotNegotiated,
}

/// Configuration errors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The address did not resolve to any socket address.
    NoAddresses {
        /// The address that failed to resolve.
        address: String,
    },
    /// Unrecognised transport name.
    UnknownTransport {
        /// The rejected value.
        value: String,
    },
    /// The transport is not available on this platform.
    UnsupportedTransport {
        /// The requested transport.
        kind: TransportKind,
    },
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for ChronyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChronyError::Transport(e) => write!(f, "chrony transport error: {e}"),
            ChronyError::Protocol(e) => write!(f, "chrony protocol error: {e}"),
            ChronyError::Decode(e) => write!(f, "chrony reply decode error: {e}"),
            ChronyError::Negotiation(e) => write!(f, "chrony version negotiation error: {e}"),
            ChronyError::Config(e) => write!(f, "chrony config error: {e}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "client is not connected"),
            TransportError::Closed => write!(f, "client is closed"),
            TransportError::Connect(e) => write!(f, "connect failed: {e}"),
            TransportError::Send(e) => write!(f, "send failed: {e}"),
            TransportError::ShortWrite { written, expected } => {
                write!(f, "short write: sent {written} of {expected} bytes")
            }
            TransportError::Recv(e) => write!(f, "receive failed: {e}"),
            TransportError::Timeout => write!(f, "receive timed out"),
        }
    }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::SequenceMismatch { expected, actual } => {
                write!(f, "sequence mismatch: sent {expected}, reply has {actual}")
            }
            ProtocolError::VersionMismatch { expected, actual } => {
                write!(f, "version mismatch: sent {expected}, reply has {actual}")
            }
            ProtocolError::UnexpectedPacketType { actual } => {
                write!(f, "unexpected packet type {} (expected reply)", actual.0)
            }
            ProtocolError::DaemonStatus { status } => {
                write!(f, "daemon returned status {status}")
            }
            ProtocolError::UnexpectedCommand { command } => {
                write!(f, "unexpected reply command {}", command.0)
            }
        }
    }
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::Unsupported { tried } => {
                write!(f, "daemon accepted none of the protocol versions")?;
                for (i, v) in tried.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{v}")?;
                }
                Ok(())
            }
            NegotiationError::NotNegotiated => {
                write!(f, "protocol version has not been negotiated")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoAddresses { address } => {
                write!(f, "address resolved to no socket addresses: {address}")
            }
            ConfigError::UnknownTransport { value } => {
                write!(f, "unknown transport {value:?} (expected udp or unixgram)")
            }
            ConfigError::UnsupportedTransport { kind } => {
                write!(f, "transport {kind} is not supported on this platform")
            }
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for ChronyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChronyError::Transport(e) => Some(e),
            ChronyError::Protocol(e) => Some(e),
            ChronyError::Decode(e) => Some(e),
            ChronyError::Negotiation(e) => Some(e),
            ChronyError::Config(e) => Some(e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Connect(e) | TransportError::Send(e) | TransportError::Recv(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

impl std::error::Error for ProtocolViolation {}
impl std::error::Error for ProtocolError {}
impl std::error::Error for NegotiationError {}
impl std::error::Error for ConfigError {}

// ── From conversions ────────────────────────────────────────────────

impl From<ChronyError> for io::Error {
    fn from(err: ChronyError) -> io::Error {
        let kind = match &err {
            ChronyError::Transport(TransportError::NotConnected | TransportError::Closed) => {
                io::ErrorKind::NotConnected
            }
            ChronyError::Transport(TransportError::Timeout) => io::ErrorKind::TimedOut,
            ChronyError::Transport(TransportError::ShortWrite { .. }) => io::ErrorKind::WriteZero,
            ChronyError::Transport(
                TransportError::Connect(e) | TransportError::Send(e) | TransportError::Recv(e),
            ) => e.kind(),
            ChronyError::Protocol(_) => io::ErrorKind::InvalidData,
            ChronyError::Decode(ParseError::BufferTooShort { .. }) => io::ErrorKind::UnexpectedEof,
            ChronyError::Decode(_) => io::ErrorKind::InvalidData,
            ChronyError::Negotiation(_) => io::ErrorKind::Unsupported,
            ChronyError::Config(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

impl From<TransportError> for ChronyError {
    fn from(err: TransportError) -> ChronyError {
        ChronyError::Transport(err)
    }
}

impl From<ProtocolViolation> for ChronyError {
    fn from(err: ProtocolViolation) -> ChronyError {
        ChronyError::Protocol(err)
    }
}

impl From<ParseError> for ChronyError {
    fn from(err: ParseError) -> ChronyError {
        ChronyError::Decode(err)
    }
}

impl From<NegotiationError> for ChronyError {
    fn from(err: NegotiationError) -> ChronyError {
        ChronyError::Negotiation(err)
    }
}

impl From<ConfigError> for ChronyError {
    fn from(err: ConfigError) -> ChronyError {
        ChronyError::Config(err)
    }
}

impl ChronyError {
    /// The protocol check that failed, if this is a protocol violation.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            ChronyError::Protocol(v) => Some(&v.error),
            _ => None,
        }
    }

    /// Whether this is a receive timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChronyError::Transport(TransportError::Timeout))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
