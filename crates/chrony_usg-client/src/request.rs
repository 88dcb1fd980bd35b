//! Request construction and reply correlation.
//!
//! Everything here is pure computation over byte buffers. The blocking
//! [`ChronyClient`](crate::ChronyClient) and the tokio client both build their
//! requests and validate their replies with these helpers.

use log::debug;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ChronyError, NegotiationError, ProtocolError, ProtocolViolation, TransportError};
use crate::protocol::{
    ActivityPayload, Command, ConstPackedSizeBytes, FromBytes, PacketType, ProtocolVersion,
    ReplyBody, ReplyHeader, RequestPacket, TrackingPayload, WriteBytes,
};

/// Size of the receive buffer for one reply datagram.
pub(crate) const RECV_BUFFER_SIZE: usize = crate::protocol::MAX_REPLY_SIZE;

/// A validated reply: its header and the body decoded for its command.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// The reply header.
    pub header: ReplyHeader,
    /// The decoded body.
    pub body: ReplyBody,
}

/// Source of request sequence numbers.
///
/// Seeded from the current time and advanced once per request. Zero is
/// reserved for "not assigned" and is never produced.
#[derive(Debug)]
pub(crate) struct SequenceGenerator {
    next: u32,
}

impl SequenceGenerator {
    pub(crate) fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::starting_at(now.as_secs() as u32 ^ now.subsec_nanos())
    }

    pub(crate) fn starting_at(seed: u32) -> Self {
        SequenceGenerator {
            next: seed.max(1),
        }
    }

    pub(crate) fn next_sequence(&mut self) -> u32 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        seq
    }
}

/// Give `request` a sequence number unless it already has one.
pub(crate) fn assign_sequence(request: &mut RequestPacket, sequence: &mut SequenceGenerator) {
    if request.sequence == 0 {
        request.sequence = sequence.next_sequence();
    }
}

/// A header-only request for `command` at the negotiated revision.
pub(crate) fn empty_request(
    version: Option<ProtocolVersion>,
    command: Command,
) -> Result<RequestPacket, NegotiationError> {
    let version = version.ok_or(NegotiationError::NotNegotiated)?;
    Ok(RequestPacket::new(version, command))
}

/// Serialize a request into its padded wire form.
pub(crate) fn build_request_bytes(
    request: &RequestPacket,
) -> Result<[u8; RequestPacket::PACKED_SIZE_BYTES], ChronyError> {
    let mut send_buf = [0u8; RequestPacket::PACKED_SIZE_BYTES];
    (&mut send_buf[..])
        .write_bytes(request)
        .map_err(TransportError::Send)?;
    Ok(send_buf)
}

fn violation(error: ProtocolError, header: ReplyHeader) -> ChronyError {
    ChronyError::Protocol(ProtocolViolation {
        error,
        header,
        payload: None,
    })
}

/// Correlate a received datagram with the request it should answer.
///
/// Checks, in order: sequence number, protocol revision, packet type, daemon
/// status and command. Only then is the body decoded.
pub(crate) fn validate_reply(request: &RequestPacket, recv_buf: &[u8]) -> Result<Reply, ChronyError> {
    let (header, n) = ReplyHeader::from_bytes(recv_buf)?;
    let payload = &recv_buf[n..];

    if header.sequence != request.sequence {
        return Err(violation(
            ProtocolError::SequenceMismatch {
                expected: request.sequence,
                actual: header.sequence,
            },
            header,
        ));
    }

    if header.version != request.version {
        return Err(violation(
            ProtocolError::VersionMismatch {
                expected: request.version,
                actual: header.version,
            },
            header,
        ));
    }

    if header.pkt_type != PacketType::REPLY {
        return Err(violation(
            ProtocolError::UnexpectedPacketType {
                actual: header.pkt_type,
            },
            header,
        ));
    }

    if !header.status.is_success() {
        return Err(violation(
            ProtocolError::DaemonStatus {
                status: header.status,
            },
            header,
        ));
    }

    if !header.command.is_known() {
        return Err(ChronyError::Protocol(ProtocolViolation {
            error: ProtocolError::UnexpectedCommand {
                command: header.command,
            },
            header,
            payload: Some(payload.to_vec()),
        }));
    }

    let (body, _) = ReplyBody::decode(header.command, payload)?;
    debug!(
        "reply: command {} status {} seq {}",
        header.command.0, header.status, header.sequence
    );
    Ok(Reply { header, body })
}

/// Whether `err` rejected a reply that answers some other request.
///
/// Such a reply is a late answer to an earlier, timed-out request; the
/// caller keeps waiting for its own reply until the deadline.
pub(crate) fn is_stale_reply(err: &ChronyError) -> bool {
    matches!(
        err.protocol_error(),
        Some(ProtocolError::SequenceMismatch { .. })
    )
}

/// Whether a probe at `candidate` was answered in that same revision.
pub(crate) fn probe_accepted(result: &Result<Reply, ChronyError>, candidate: ProtocolVersion) -> bool {
    match result {
        Ok(reply) => reply.header.version == candidate,
        Err(e) => {
            debug!("protocol version {} rejected: {}", candidate, e);
            false
        }
    }
}

fn mismatched_body(reply: Reply) -> ChronyError {
    ChronyError::Protocol(ProtocolViolation {
        error: ProtocolError::UnexpectedCommand {
            command: reply.header.command,
        },
        header: reply.header,
        payload: None,
    })
}

pub(crate) fn into_tracking(reply: Reply) -> Result<TrackingPayload, ChronyError> {
    match reply.body {
        ReplyBody::Tracking(tracking) => Ok(tracking),
        _ => Err(mismatched_body(reply)),
    }
}

pub(crate) fn into_activity(reply: Reply) -> Result<ActivityPayload, ChronyError> {
    match reply.body {
        ReplyBody::Activity(activity) => Ok(activity),
        _ => Err(mismatched_body(reply)),
    }
}

pub(crate) fn into_source_count(reply: Reply) -> Result<u32, ChronyError> {
    match reply.body {
        ReplyBody::SourceCount(count) => Ok(count.n_sources),
        _ => Err(mismatched_body(reply)),
    }
}
