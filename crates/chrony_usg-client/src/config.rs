// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client configuration: daemon address, transport and receive timeout.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrony_proto::protocol::DEFAULT_ADDRESS;

use crate::error::ConfigError;

/// Receive timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Receive timeout substituted for a configured zero timeout.
pub const ZERO_TIMEOUT_FALLBACK: Duration = Duration::from_secs(1);

/// Which datagram socket family talks to the daemon.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum TransportKind {
    /// UDP to `host:port` (chronyd listens on port 323).
    #[default]
    Udp,
    /// Unix datagram socket at a filesystem path. Unix only.
    Unixgram,
}

impl TransportKind {
    /// The configuration name of this transport.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Unixgram => "unixgram",
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "unixgram" | "unix" => Ok(TransportKind::Unixgram),
            _ => Err(ConfigError::UnknownTransport {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach chronyd's command socket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    /// `host:port` for UDP, or a socket path for `unixgram`.
    pub address: String,
    /// Socket family.
    pub transport: TransportKind,
    /// Upper bound on each receive. Zero is replaced by [`ZERO_TIMEOUT_FALLBACK`].
    pub timeout: Duration,
}

impl ClientConfig {
    /// The receive timeout actually applied to the channel.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            ZERO_TIMEOUT_FALLBACK
        } else {
            self.timeout
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: DEFAULT_ADDRESS.to_string(),
            transport: TransportKind::Udp,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
