// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests: a simulated chronyd on a loopback
//! UDP port.

// Integration test helpers are `pub` so each `tests/*.rs` file can import them
// via `mod common`, but not every file uses every helper.
#![allow(dead_code, unreachable_pub)]

use std::net::{IpAddr as NetIpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrony_client::ClientConfig;
use chrony_client::float::ChronyFloat;
use chrony_client::protocol::{
    ActivityPayload, Command, ConstPackedSizeBytes, FromBytes, IpAddr, PacketType,
    ProtocolVersion, ReplyCode, ReplyHeader, RequestPacket, SourceCountPayload, Status, ToBytes,
    TrackingPayload,
};
use chrony_client::timespec::Timespec;

/// How the simulated daemon answers a request in a revision it does not speak.
#[derive(Clone, Copy, Debug)]
pub enum Rejection {
    /// Reply header-only with status `BAD_PKT_VERSION`, as chronyd does.
    BadVersionStatus,
    /// Reply in the given revision instead of the request's.
    ReplyVersion(u8),
    /// Do not reply at all.
    Silent,
}

/// Scripted behaviour of the simulated daemon.
#[derive(Clone, Debug)]
pub struct Behaviour {
    /// Revisions answered normally.
    pub accepted_versions: Vec<ProtocolVersion>,
    /// Answer for other revisions.
    pub rejection: Rejection,
    /// Never reply.
    pub silent: bool,
    /// Added to the echoed sequence number.
    pub sequence_offset: u32,
    /// Echo this command instead of the request's (for non-null requests).
    pub reply_command: Option<Command>,
    /// Status for non-null requests.
    pub status: Status,
    /// Cut the reply body to this many bytes.
    pub truncate_body: Option<usize>,
    /// Hold back the reply to the first request for this long.
    pub delay_first_reply: Option<Duration>,
    /// Tracking reply body.
    pub tracking: TrackingPayload,
    /// Activity reply body.
    pub activity: ActivityPayload,
    /// Source count reply body.
    pub n_sources: u32,
}

impl Default for Behaviour {
    fn default() -> Self {
        Behaviour {
            accepted_versions: vec![ProtocolVersion::V6, ProtocolVersion::V5],
            rejection: Rejection::BadVersionStatus,
            silent: false,
            sequence_offset: 0,
            reply_command: None,
            status: Status::SUCCESS,
            truncate_body: None,
            delay_first_reply: None,
            tracking: sample_tracking(),
            activity: sample_activity(),
            n_sources: 5,
        }
    }
}

/// Tracking state of a stratum 3 daemon synchronised to 192.0.2.1.
pub fn sample_tracking() -> TrackingPayload {
    TrackingPayload {
        ref_id: 0xc000_0201,
        ip_addr: IpAddr::from(NetIpAddr::from([192, 0, 2, 1])),
        stratum: 3,
        leap_status: 0,
        ref_time: Timespec::new(1_700_000_000, 500_000_000),
        current_correction: ChronyFloat::from_f64(-0.000_012_5),
        last_offset: ChronyFloat::from_f64(0.000_003),
        rms_offset: ChronyFloat::from_f64(0.000_021),
        freq_ppm: ChronyFloat::from_f64(-14.75),
        resid_freq_ppm: ChronyFloat::from_f64(0.001),
        skew_ppm: ChronyFloat::from_f64(0.125),
        root_delay: ChronyFloat::from_f64(0.0213),
        root_dispersion: ChronyFloat::from_f64(0.0017),
        last_update_interval: ChronyFloat::from_f64(64.0),
    }
}

/// Four sources online, one offline.
pub fn sample_activity() -> ActivityPayload {
    ActivityPayload {
        online: 4,
        offline: 1,
        burst_online: 0,
        burst_offline: 0,
        unresolved: 0,
    }
}

/// A request as seen by the simulated daemon.
#[derive(Clone, Debug)]
pub struct Received {
    /// Datagram length.
    pub len: usize,
    /// Parsed request header.
    pub request: RequestPacket,
}

/// A simulated chronyd answering command requests on `127.0.0.1`.
pub struct SimulatedDaemon {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedDaemon {
    /// Start a daemon on an ephemeral port.
    pub fn spawn(behaviour: Behaviour) -> Self {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        sock.set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let addr = sock.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let received = Arc::clone(&received);
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(sock, behaviour, received, stop))
        };

        SimulatedDaemon {
            addr,
            received,
            stop,
            handle: Some(handle),
        }
    }

    /// The daemon's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// A client configuration pointing at this daemon.
    pub fn config(&self, timeout: Duration) -> ClientConfig {
        ClientConfig {
            address: self.addr.to_string(),
            timeout,
            ..ClientConfig::default()
        }
    }

    /// Requests received so far, in order.
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// `(version, command)` of each request received so far.
    pub fn commands(&self) -> Vec<(u8, u16)> {
        self.received()
            .iter()
            .map(|r| (r.request.version.0, r.request.command.0))
            .collect()
    }
}

impl Drop for SimulatedDaemon {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    sock: UdpSocket,
    behaviour: Behaviour,
    received: Arc<Mutex<Vec<Received>>>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 1024];
    let mut delay = behaviour.delay_first_reply;
    while !stop.load(Ordering::Relaxed) {
        let (len, peer) = match sock.recv_from(&mut buf) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let Ok((request, _)) = RequestPacket::from_bytes(&buf[..len]) else {
            continue;
        };
        received.lock().unwrap().push(Received { len, request });

        if let Some(reply) = build_reply(&behaviour, &request) {
            if let Some(d) = delay.take() {
                thread::sleep(d);
            }
            let _ = sock.send_to(&reply, peer);
        }
    }
}

fn build_reply(behaviour: &Behaviour, request: &RequestPacket) -> Option<Vec<u8>> {
    if behaviour.silent {
        return None;
    }

    let mut header = ReplyHeader {
        version: request.version,
        pkt_type: PacketType::REPLY,
        command: request.command,
        reply: ReplyCode::NULL,
        status: Status::SUCCESS,
        sequence: request.sequence.wrapping_add(behaviour.sequence_offset),
        ..ReplyHeader::default()
    };

    if !behaviour.accepted_versions.contains(&request.version) {
        match behaviour.rejection {
            Rejection::BadVersionStatus => header.status = Status::BAD_PKT_VERSION,
            Rejection::ReplyVersion(v) => header.version = ProtocolVersion(v),
            Rejection::Silent => return None,
        }
        return Some(encode(&header, &[]));
    }

    let mut body = Vec::new();
    if request.command != Command::NULL {
        header.status = behaviour.status;
        if let Some(command) = behaviour.reply_command {
            header.command = command;
        }
        match header.command {
            Command::TRACKING => {
                header.reply = ReplyCode::TRACKING;
                body = vec![0u8; TrackingPayload::PACKED_SIZE_BYTES];
                behaviour.tracking.to_bytes(&mut body).unwrap();
            }
            Command::ACTIVITY => {
                header.reply = ReplyCode::ACTIVITY;
                body = vec![0u8; ActivityPayload::PACKED_SIZE_BYTES];
                behaviour.activity.to_bytes(&mut body).unwrap();
            }
            Command::N_SOURCES => {
                header.reply = ReplyCode::N_SOURCES;
                body = vec![0u8; SourceCountPayload::PACKED_SIZE_BYTES];
                SourceCountPayload {
                    n_sources: behaviour.n_sources,
                }
                .to_bytes(&mut body)
                .unwrap();
            }
            _ => body = vec![0xab; 8],
        }
    }
    if let Some(n) = behaviour.truncate_body {
        body.truncate(n);
    }
    Some(encode(&header, &body))
}

fn encode(header: &ReplyHeader, body: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; ReplyHeader::PACKED_SIZE_BYTES];
    header.to_bytes(&mut buf).unwrap();
    buf.extend_from_slice(body);
    buf
}
