// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Connected datagram channels to chronyd's command socket.
//!
//! A [`Channel`] carries exactly one datagram per send and per receive. It
//! never retries; timeouts and short writes are reported to the caller.
//! Replies that arrive after their request timed out stay queued on the
//! socket until [`Channel::drain`] discards them.

use log::debug;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::{ClientConfig, TransportKind};
use crate::error::{ChronyError, ConfigError, TransportError};
use crate::protocol::PORT;

/// Select the bind address matching the target's address family.
pub(crate) fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

/// Append the command port to a UDP address given as a bare host or IP.
pub(crate) fn with_default_port(address: &str) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address.to_string();
    }
    if let Ok(ip) = address.parse::<std::net::IpAddr>() {
        return SocketAddr::new(ip, PORT).to_string();
    }
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, PORT)
    }
}

/// Take the first resolved address, or fail with [`ConfigError::NoAddresses`].
pub(crate) fn first_address<I>(addrs: I, address: &str) -> Result<SocketAddr, ConfigError>
where
    I: IntoIterator<Item = SocketAddr>,
{
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::NoAddresses {
            address: address.to_string(),
        })
}

/// Classify a receive error: an expired read timeout is [`TransportError::Timeout`].
pub(crate) fn recv_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Recv(e),
    }
}

/// Mode of the client's Unix socket file. chronyd drops root privileges
/// after startup and must still be able to send replies to it.
#[cfg(unix)]
pub(crate) const CLIENT_SOCKET_MODE: u32 = 0o666;

/// Fail with [`TransportError::ShortWrite`] unless the whole request was sent.
pub(crate) fn check_written(written: usize, expected: usize) -> Result<(), TransportError> {
    if written != expected {
        return Err(TransportError::ShortWrite { written, expected });
    }
    Ok(())
}

#[derive(Debug)]
enum Socket {
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix {
        socket: UnixDatagram,
        local_path: PathBuf,
    },
}

/// One connected datagram channel to the daemon.
///
/// Dropping the channel releases the socket and, for Unix datagram channels,
/// removes the client's socket file.
#[derive(Debug)]
pub struct Channel {
    socket: Socket,
    timeout: Duration,
}

impl Channel {
    /// Open a channel according to `config`.
    ///
    /// UDP channels bind an ephemeral local port and connect to the first
    /// resolved address. Unix datagram channels bind a private path under the
    /// system temporary directory, since the daemon replies to the sender's
    /// address.
    pub fn open(config: &ClientConfig) -> Result<Channel, ChronyError> {
        let timeout = config.effective_timeout();
        match config.transport {
            TransportKind::Udp => Self::open_udp(&config.address, timeout),
            TransportKind::Unixgram => Self::open_unix(&config.address, timeout),
        }
    }

    fn open_udp(address: &str, timeout: Duration) -> Result<Channel, ChronyError> {
        let addrs = with_default_port(address)
            .to_socket_addrs()
            .map_err(|_| ConfigError::NoAddresses {
                address: address.to_string(),
            })?;
        let target = first_address(addrs, address)?;

        let sock = UdpSocket::bind(bind_addr_for(&target)).map_err(TransportError::Connect)?;
        sock.set_read_timeout(Some(timeout))
            .map_err(TransportError::Connect)?;
        sock.set_write_timeout(Some(timeout))
            .map_err(TransportError::Connect)?;
        sock.connect(target).map_err(TransportError::Connect)?;
        debug!("udp channel {:?} -> {}", sock.local_addr(), target);

        Ok(Channel {
            socket: Socket::Udp(sock),
            timeout,
        })
    }

    #[cfg(unix)]
    fn open_unix(path: &str, timeout: Duration) -> Result<Channel, ChronyError> {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

        let local_path = std::env::temp_dir().join(format!(
            "chrony_usg.{}.{}.sock",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        ));
        // A previous process with the same pid may have left the file behind.
        let _ = std::fs::remove_file(&local_path);

        let socket = UnixDatagram::bind(&local_path).map_err(TransportError::Connect)?;
        // From here on, dropping the channel removes the socket file.
        let channel = Channel {
            socket: Socket::Unix {
                socket,
                local_path,
            },
            timeout,
        };
        if let Socket::Unix { socket, local_path } = &channel.socket {
            std::fs::set_permissions(
                local_path,
                std::fs::Permissions::from_mode(CLIENT_SOCKET_MODE),
            )
            .map_err(TransportError::Connect)?;
            socket
                .set_read_timeout(Some(timeout))
                .map_err(TransportError::Connect)?;
            socket
                .set_write_timeout(Some(timeout))
                .map_err(TransportError::Connect)?;
            socket.connect(path).map_err(TransportError::Connect)?;
            debug!("unixgram channel {} -> {}", local_path.display(), path);
        }
        Ok(channel)
    }

    #[cfg(not(unix))]
    fn open_unix(_path: &str, _timeout: Duration) -> Result<Channel, ChronyError> {
        Err(ConfigError::UnsupportedTransport {
            kind: TransportKind::Unixgram,
        }
        .into())
    }

    /// Send `bytes` as a single datagram.
    pub fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let written = match &self.socket {
            Socket::Udp(sock) => sock.send(bytes),
            #[cfg(unix)]
            Socket::Unix { socket, .. } => socket.send(bytes),
        }
        .map_err(TransportError::Send)?;
        debug!("sent: {}", written);
        check_written(written, bytes.len())
    }

    /// Receive one datagram into `buf`, waiting at most the configured timeout.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.recv_before(buf, Instant::now() + self.timeout)
    }

    /// Receive one datagram into `buf`, giving up at `deadline`.
    pub fn recv_before(&self, buf: &mut [u8], deadline: Instant) -> Result<usize, TransportError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }
        let len = match &self.socket {
            Socket::Udp(sock) => sock
                .set_read_timeout(Some(remaining))
                .and_then(|()| sock.recv(buf)),
            #[cfg(unix)]
            Socket::Unix { socket, .. } => socket
                .set_read_timeout(Some(remaining))
                .and_then(|()| socket.recv(buf)),
        }
        .map_err(recv_error)?;
        debug!("recv: {} bytes", len);
        Ok(len)
    }

    /// Discard every datagram already queued on the socket without waiting.
    ///
    /// Returns how many were dropped. Receive errors end the drain; they
    /// belong to earlier requests.
    pub fn drain(&self) -> Result<usize, TransportError> {
        self.set_nonblocking(true)?;
        let mut buf = [0u8; 64];
        let mut dropped = 0;
        loop {
            let res = match &self.socket {
                Socket::Udp(sock) => sock.recv(&mut buf),
                #[cfg(unix)]
                Socket::Unix { socket, .. } => socket.recv(&mut buf),
            };
            match res {
                Ok(_) => dropped += 1,
                Err(_) => break,
            }
        }
        self.set_nonblocking(false)?;
        if dropped > 0 {
            debug!("discarded {} stale datagram(s)", dropped);
        }
        Ok(dropped)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<(), TransportError> {
        match &self.socket {
            Socket::Udp(sock) => sock.set_nonblocking(nonblocking),
            #[cfg(unix)]
            Socket::Unix { socket, .. } => socket.set_nonblocking(nonblocking),
        }
        .map_err(TransportError::Recv)
    }

    /// Release the channel.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(unix)]
impl Drop for Channel {
    fn drop(&mut self) {
        if let Socket::Unix { local_path, .. } = &self.socket {
            let _ = std::fs::remove_file(local_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_for_family() {
        let v4: SocketAddr = "127.0.0.1:323".parse().unwrap();
        let v6: SocketAddr = "[::1]:323".parse().unwrap();
        assert!(bind_addr_for(&v4).is_ipv4());
        assert!(bind_addr_for(&v6).is_ipv6());
        assert_eq!(bind_addr_for(&v4).port(), 0);
    }

    #[test]
    fn test_with_default_port() {
        assert_eq!(with_default_port("127.0.0.1"), "127.0.0.1:323");
        assert_eq!(with_default_port("::1"), "[::1]:323");
        assert_eq!(with_default_port("localhost"), "localhost:323");
        assert_eq!(with_default_port("127.0.0.1:3230"), "127.0.0.1:3230");
        assert_eq!(with_default_port("[::1]:3230"), "[::1]:3230");
        assert_eq!(with_default_port("ntp.example:4000"), "ntp.example:4000");
    }

    #[test]
    fn test_first_address_empty() {
        let res = first_address(Vec::new(), "nowhere:323");
        assert_eq!(
            res,
            Err(ConfigError::NoAddresses {
                address: "nowhere:323".to_string()
            })
        );
    }

    #[test]
    fn test_recv_error_classification() {
        assert!(matches!(
            recv_error(io::Error::from(io::ErrorKind::WouldBlock)),
            TransportError::Timeout
        ));
        assert!(matches!(
            recv_error(io::Error::from(io::ErrorKind::TimedOut)),
            TransportError::Timeout
        ));
        assert!(matches!(
            recv_error(io::Error::from(io::ErrorKind::ConnectionRefused)),
            TransportError::Recv(_)
        ));
    }

    #[test]
    fn test_check_written() {
        assert!(check_written(408, 408).is_ok());
        assert!(matches!(
            check_written(100, 408),
            Err(TransportError::ShortWrite {
                written: 100,
                expected: 408
            })
        ));
    }

    #[test]
    fn test_open_udp_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            address: server.local_addr().unwrap().to_string(),
            ..ClientConfig::default()
        };
        let channel = Channel::open(&config).unwrap();
        channel.send(&[1, 2, 3]).unwrap();

        let mut buf = [0u8; 16];
        let (n, peer) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
        server.send_to(&[9], peer).unwrap();

        let n = channel.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[9]);
        channel.close();
    }

    #[test]
    fn test_recv_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            address: server.local_addr().unwrap().to_string(),
            timeout: Duration::from_millis(50),
            ..ClientConfig::default()
        };
        let channel = Channel::open(&config).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(channel.recv(&mut buf), Err(TransportError::Timeout)));
    }

    #[test]
    fn test_drain_discards_queued_datagrams() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            address: server.local_addr().unwrap().to_string(),
            timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        };
        let channel = Channel::open(&config).unwrap();
        channel.send(&[1]).unwrap();
        let mut buf = [0u8; 16];
        let (_, peer) = server.recv_from(&mut buf).unwrap();

        server.send_to(&[0xaa], peer).unwrap();
        server.send_to(&[0xbb], peer).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(channel.drain().unwrap(), 2);
        assert_eq!(channel.drain().unwrap(), 0);

        // Still blocking with the configured timeout afterwards.
        server.send_to(&[0xcc], peer).unwrap();
        assert_eq!(channel.recv(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0xcc);
        assert!(matches!(channel.recv(&mut buf), Err(TransportError::Timeout)));
    }

    #[test]
    fn test_recv_before_past_deadline() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            address: server.local_addr().unwrap().to_string(),
            ..ClientConfig::default()
        };
        let channel = Channel::open(&config).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(
            channel.recv_before(&mut buf, Instant::now()),
            Err(TransportError::Timeout)
        ));
    }

    #[test]
    fn test_open_unresolvable() {
        let config = ClientConfig {
            address: "not an address".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            Channel::open(&config),
            Err(ChronyError::Config(ConfigError::NoAddresses { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_channel_removes_client_path() {
        let dir = std::env::temp_dir().join(format!("chrony_usg_test.{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let server_path = dir.join("chronyd.sock");
        let _ = std::fs::remove_file(&server_path);
        let server = UnixDatagram::bind(&server_path).unwrap();

        let config = ClientConfig {
            address: server_path.to_string_lossy().into_owned(),
            transport: TransportKind::Unixgram,
            ..ClientConfig::default()
        };
        let channel = Channel::open(&config).unwrap();
        channel.send(&[7; 8]).unwrap();

        let mut buf = [0u8; 16];
        let (n, peer) = server.recv_from(&mut buf).unwrap();
        assert_eq!(n, 8);
        let client_path = peer.as_pathname().unwrap().to_path_buf();
        assert!(client_path.exists());
        let mode = std::fs::metadata(&client_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, CLIENT_SOCKET_MODE);

        server.send_to(&[1, 2], &client_path).unwrap();
        assert_eq!(channel.recv(&mut buf).unwrap(), 2);

        channel.close();
        assert!(!client_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
