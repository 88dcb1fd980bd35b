// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Blocking client for chronyd's command socket.
//!
//! A [`ChronyClient`] owns one datagram channel and at most one request in
//! flight. The protocol revision is negotiated lazily on the first typed
//! query and kept for the lifetime of the connection.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), chrony_client::error::ChronyError> {
//! use std::time::Duration;
//! use chrony_client::ChronyClient;
//!
//! let mut client = ChronyClient::builder()
//!     .address("127.0.0.1:323")
//!     .timeout(Duration::from_millis(500))
//!     .connect()?;
//!
//! let tracking = client.fetch_tracking()?;
//! println!("stratum {} via {}", tracking.stratum, tracking.ip_addr);
//! # Ok(())
//! # }
//! ```

use log::{debug, warn};
use std::time::{Duration, Instant};

use crate::config::{ClientConfig, TransportKind};
use crate::error::{ChronyError, NegotiationError, TransportError};
use crate::protocol::{ActivityPayload, Command, ProtocolVersion, RequestPacket, TrackingPayload};
use crate::request::{
    RECV_BUFFER_SIZE, Reply, SequenceGenerator, assign_sequence, build_request_bytes,
    empty_request, into_activity, into_source_count, into_tracking, is_stale_reply,
    probe_accepted, validate_reply,
};
use crate::transport::Channel;

#[derive(Debug)]
enum State {
    Unconnected,
    Connected {
        channel: Channel,
        version: Option<ProtocolVersion>,
    },
    Closed,
}

/// Builder for [`ChronyClient`].
#[derive(Clone, Debug, Default)]
pub struct ChronyClientBuilder {
    config: ClientConfig,
}

impl ChronyClientBuilder {
    /// Daemon address: `host:port` for UDP, a socket path for `unixgram`.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Socket family used to reach the daemon.
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.config.transport = transport;
        self
    }

    /// Upper bound on each receive.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build an unconnected client.
    pub fn build(self) -> ChronyClient {
        ChronyClient::new(self.config)
    }

    /// Build a client and open its channel.
    pub fn connect(self) -> Result<ChronyClient, ChronyError> {
        ChronyClient::connect(self.config)
    }
}

/// Blocking chronyd command client.
#[derive(Debug)]
pub struct ChronyClient {
    config: ClientConfig,
    state: State,
    sequence: SequenceGenerator,
}

impl ChronyClient {
    /// Create a builder with the default configuration.
    pub fn builder() -> ChronyClientBuilder {
        ChronyClientBuilder::default()
    }

    /// Create an unconnected client. Call [`open`](Self::open) before querying.
    pub fn new(config: ClientConfig) -> Self {
        ChronyClient {
            config,
            state: State::Unconnected,
            sequence: SequenceGenerator::new(),
        }
    }

    /// Create a client and open its channel.
    pub fn connect(config: ClientConfig) -> Result<Self, ChronyError> {
        let mut client = Self::new(config);
        client.open()?;
        Ok(client)
    }

    /// Open the channel. Has no effect on a client that is already connected.
    ///
    /// A closed client cannot be reopened; create a new one instead.
    pub fn open(&mut self) -> Result<(), ChronyError> {
        match self.state {
            State::Unconnected => {
                let channel = Channel::open(&self.config)?;
                self.state = State::Connected {
                    channel,
                    version: None,
                };
                Ok(())
            }
            State::Connected { .. } => Ok(()),
            State::Closed => Err(TransportError::Closed.into()),
        }
    }

    /// Release the channel. Safe to call more than once.
    pub fn close(&mut self) {
        if let State::Connected { .. } = self.state {
            debug!("closing chrony client for {}", self.config.address);
        }
        self.state = State::Closed;
    }

    /// Whether the channel is open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected { .. })
    }

    /// The client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The negotiated protocol revision, if any.
    pub fn version(&self) -> Option<ProtocolVersion> {
        match self.state {
            State::Connected { version, .. } => version,
            _ => None,
        }
    }

    fn channel(&self) -> Result<&Channel, TransportError> {
        match &self.state {
            State::Unconnected => Err(TransportError::NotConnected),
            State::Connected { channel, .. } => Ok(channel),
            State::Closed => Err(TransportError::Closed),
        }
    }

    /// Send `request` and wait for the reply that answers it.
    ///
    /// A zero sequence number is replaced with a fresh one before sending.
    /// The request is sent once and never retried. Replies carrying another
    /// request's sequence number are late answers to earlier requests; they
    /// are discarded while the timeout lasts, and the last one is reported
    /// if nothing else arrives.
    pub fn submit(&mut self, request: &mut RequestPacket) -> Result<Reply, ChronyError> {
        self.channel()?;
        assign_sequence(request, &mut self.sequence);
        let send_buf = build_request_bytes(request)?;

        let channel = self.channel()?;
        channel.drain()?;
        channel.send(&send_buf)?;
        let deadline = Instant::now() + self.config.effective_timeout();

        let mut recv_buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut stale = None;
        loop {
            let recv_len = match channel.recv_before(&mut recv_buf, deadline) {
                Ok(n) => n,
                Err(TransportError::Timeout) => {
                    return Err(stale.unwrap_or_else(|| TransportError::Timeout.into()));
                }
                Err(e) => return Err(e.into()),
            };
            match validate_reply(request, &recv_buf[..recv_len]) {
                Err(e) if is_stale_reply(&e) => {
                    debug!("discarding stale reply: {}", e);
                    stale = Some(e);
                }
                result => return result,
            }
        }
    }

    /// Probe the daemon with null requests until a protocol revision is
    /// accepted, and pin it for this connection.
    ///
    /// Revisions are tried newest first. On failure the client stays
    /// unpinned and may negotiate again.
    pub fn negotiate(&mut self) -> Result<ProtocolVersion, ChronyError> {
        self.channel()?;
        let mut tried = Vec::new();
        for candidate in ProtocolVersion::SUPPORTED {
            debug!("probing protocol version {}", candidate);
            tried.push(candidate);
            let mut probe = RequestPacket::new(candidate, Command::NULL);
            let result = self.submit(&mut probe);
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

    fn ensure_negotiated(&mut self) -> Result<(), ChronyError> {
        self.channel()?;
        if self.version().is_none() {
            self.negotiate()?;
        }
        Ok(())
    }

    /// A header-only request for `command` at the negotiated revision.
    ///
    /// Fails with [`NegotiationError::NotNegotiated`] before negotiation.
    pub fn empty_request(&self, command: Command) -> Result<RequestPacket, ChronyError> {
        Ok(empty_request(self.version(), command)?)
    }

    fn query(&mut self, command: Command) -> Result<Reply, ChronyError> {
        self.ensure_negotiated()?;
        let mut request = self.empty_request(command)?;
        self.submit(&mut request)
    }

    /// Fetch the system clock's tracking state.
    pub fn fetch_tracking(&mut self) -> Result<TrackingPayload, ChronyError> {
        into_tracking(self.query(Command::TRACKING)?)
    }

    /// Fetch how many sources are in each activity state.
    pub fn fetch_activity(&mut self) -> Result<ActivityPayload, ChronyError> {
        into_activity(self.query(Command::ACTIVITY)?)
    }

    /// Fetch the number of configured sources.
    pub fn fetch_source_count(&mut self) -> Result<u32, ChronyError> {
        into_source_count(self.query(Command::N_SOURCES)?)
    }
}
