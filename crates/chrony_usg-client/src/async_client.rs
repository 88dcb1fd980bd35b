// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Async chronyd command client using the Tokio runtime.
//!
//! [`AsyncChronyClient`] mirrors the blocking [`ChronyClient`](crate::ChronyClient)
//! over [`tokio::net::UdpSocket`], bounding each receive with
//! [`tokio::time::timeout`]. Packet building and reply validation are shared
//! with the blocking client.
//!
//! # Runtime Requirements
//!
//! These functions must be called from within a Tokio runtime context.
//! The library does **not** create a runtime; you must provide one.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> Result<(), chrony_client::error::ChronyError> {
//! use chrony_client::async_client::AsyncChronyClient;
//! use chrony_client::config::ClientConfig;
//!
//! let mut client = AsyncChronyClient::connect(ClientConfig::default()).await?;
//! let activity = client.fetch_activity().await?;
//! println!("{activity}");
//! # Ok(())
//! # }
//! ```

use log::{debug, warn};
use tokio::net::UdpSocket;

use crate::config::{ClientConfig, TransportKind};
use crate::error::{ChronyError, ConfigError, NegotiationError, TransportError};
use crate::protocol::{ActivityPayload, Command, ProtocolVersion, RequestPacket, TrackingPayload};
use crate::request::{
    RECV_BUFFER_SIZE, Reply, SequenceGenerator, assign_sequence, build_request_bytes,
    empty_request, into_activity, into_source_count, into_tracking, is_stale_reply,
    probe_accepted, validate_reply,
};
use crate::transport::{
    bind_addr_for, check_written, first_address, recv_error, with_default_port,
};

#[derive(Debug)]
enum State {
    Unconnected,
    Connected {
        socket: UdpSocket,
        version: Option<ProtocolVersion>,
    },
    Closed,
}

/// Async chronyd command client. UDP only.
#[derive(Debug)]
pub struct AsyncChronyClient {
    config: ClientConfig,
    state: State,
    sequence: SequenceGenerator,
}

impl AsyncChronyClient {
    /// Create an unconnected client.
    pub fn new(config: ClientConfig) -> Self {
        AsyncChronyClient {
            config,
            state: State::Unconnected,
            sequence: SequenceGenerator::new(),
        }
    }

    /// Create a client and open its socket.
    pub async fn connect(config: ClientConfig) -> Result<Self, ChronyError> {
        let mut client = Self::new(config);
        client.open().await?;
        Ok(client)
    }

    /// Open the socket. Has no effect on a client that is already connected.
    pub async fn open(&mut self) -> Result<(), ChronyError> {
        match self.state {
            State::Unconnected => {}
            State::Connected { .. } => return Ok(()),
            State::Closed => return Err(TransportError::Closed.into()),
        }
        if self.config.transport != TransportKind::Udp {
            return Err(ConfigError::UnsupportedTransport {
                kind: self.config.transport,
            }
            .into());
        }

        let address = self.config.address.as_str();
        let addrs = tokio::net::lookup_host(with_default_port(address))
            .await
            .map_err(|_| ConfigError::NoAddresses {
                address: address.to_string(),
            })?;
        let target = first_address(addrs, address)?;

        let socket = UdpSocket::bind(bind_addr_for(&target))
            .await
            .map_err(TransportError::Connect)?;
        socket.connect(target).await.map_err(TransportError::Connect)?;
        debug!("udp channel {:?} -> {}", socket.local_addr(), target);

        self.state = State::Connected {
            socket,
            version: None,
        };
        Ok(())
    }

    /// Release the socket. Safe to call more than once.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    /// Whether the socket is open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected { .. })
    }

    /// The negotiated protocol revision, if any.
    pub fn version(&self) -> Option<ProtocolVersion> {
        match self.state {
            State::Connected { version, .. } => version,
            _ => None,
        }
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        match &self.state {
            State::Unconnected => Err(TransportError::NotConnected),
            State::Connected { socket, .. } => Ok(socket),
            State::Closed => Err(TransportError::Closed),
        }
    }

    /// Send `request` and wait for the reply that answers it.
    ///
    /// Late replies to earlier requests are discarded until the timeout, as
    /// in [`ChronyClient::submit`](crate::ChronyClient::submit).
    pub async fn submit(&mut self, request: &mut RequestPacket) -> Result<Reply, ChronyError> {
        self.socket()?;
        assign_sequence(request, &mut self.sequence);
        let send_buf = build_request_bytes(request)?;
        let timeout = self.config.effective_timeout();

        let socket = self.socket()?;
        let mut recv_buf = vec![0u8; RECV_BUFFER_SIZE];
        drain(socket, &mut recv_buf);

        let sz = socket.send(&send_buf).await.map_err(TransportError::Send)?;
        debug!("sent: {}", sz);
        check_written(sz, send_buf.len())?;
        let deadline = tokio::time::Instant::now() + timeout;

        let mut stale = None;
        loop {
            let recv_len =
                match tokio::time::timeout_at(deadline, socket.recv(&mut recv_buf)).await {
                    Ok(res) => res.map_err(recv_error)?,
                    Err(_) => {
                        return Err(stale.unwrap_or_else(|| TransportError::Timeout.into()));
                    }
                };
            debug!("recv: {} bytes", recv_len);
            match validate_reply(request, &recv_buf[..recv_len]) {
                Err(e) if is_stale_reply(&e) => {
                    debug!("discarding stale reply: {}", e);
                    stale = Some(e);
                }
                result => return result,
            }
        }
    }

    /// Probe the daemon until a protocol revision is accepted, and pin it.
    pub async fn negotiate(&mut self) -> Result<ProtocolVersion, ChronyError> {
        self.socket()?;
        let mut tried = Vec::new();
        for candidate in ProtocolVersion::SUPPORTED {
            debug!("probing protocol version {}", candidate);
            tried.push(candidate);
            let mut probe = RequestPacket::new(candidate, Command::NULL);
            let result = self.submit(&mut probe).await;
            if probe_accepted(&result, candidate) {
                if let State::Connected { version, .. } = &mut self.state {
                    *version = Some(candidate);
                }
                debug!("negotiated protocol version {}", candidate);
                return Ok(candidate);
            }
        }
        warn!(
            "chronyd at {} accepted none of the protocol versions {:?}",
            self.config.address, tried
        );
        Err(NegotiationError::Unsupported { tried }.into())
    }

    /// A header-only request for `command` at the negotiated revision.
    pub fn empty_request(&self, command: Command) -> Result<RequestPacket, ChronyError> {
        Ok(empty_request(self.version(), command)?)
    }

    async fn query(&mut self, command: Command) -> Result<Reply, ChronyError> {
        self.socket()?;
        if self.version().is_none() {
            self.negotiate().await?;
        }
        let mut request = self.empty_request(command)?;
        self.submit(&mut request).await
    }

    /// Fetch the system clock's tracking state.
    pub async fn fetch_tracking(&mut self) -> Result<TrackingPayload, ChronyError> {
        into_tracking(self.query(Command::TRACKING).await?)
    }

    /// Fetch how many sources are in each activity state.
    pub async fn fetch_activity(&mut self) -> Result<ActivityPayload, ChronyError> {
        into_activity(self.query(Command::ACTIVITY).await?)
    }

    /// Fetch the number of configured sources.
    pub async fn fetch_source_count(&mut self) -> Result<u32, ChronyError> {
        into_source_count(self.query(Command::N_SOURCES).await?)
    }
}

// Discard datagrams already queued on the socket.
fn drain(socket: &UdpSocket, buf: &mut [u8]) {
    let mut dropped = 0;
    while socket.try_recv(buf).is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!("discarded {} stale datagram(s)", dropped);
    }
}
