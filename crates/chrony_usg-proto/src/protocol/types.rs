use core::fmt;
use core::net::{IpAddr as NetIpAddr, Ipv4Addr, Ipv6Addr};

use super::ConstPackedSizeBytes;
use crate::error::ParseError;
use crate::float::ChronyFloat;
use crate::timespec::Timespec;

/// Command protocol revision carried in the first byte of every packet.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProtocolVersion(pub u8);

/// The kind of packet: request or reply.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct PacketType(pub u8);

/// Request command code. Replies echo the command of the request they answer.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Command(pub u16);

/// Reply layout code set by the daemon.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ReplyCode(pub u16);

/// Reply status code set by the daemon.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Status(pub u16);

/// Leap second status reported in tracking replies.
#[repr(u16)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapStatus {
    /// No leap second pending.
    #[default]
    Normal = 0,
    /// A leap second will be inserted at the end of the day.
    InsertSecond = 1,
    /// A leap second will be deleted at the end of the day.
    DeleteSecond = 2,
    /// The clock is not synchronized.
    Unsynchronised = 3,
}

impl TryFrom<u16> for LeapStatus {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LeapStatus::Normal),
            1 => Ok(LeapStatus::InsertSecond),
            2 => Ok(LeapStatus::DeleteSecond),
            3 => Ok(LeapStatus::Unsynchronised),
            _ => Err(ParseError::InvalidField {
                field: "leap status",
                value: value as u32,
            }),
        }
    }
}

/// An IP address as chronyd puts it on the wire: a 16-byte buffer tagged with
/// its address family.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                       Address (16 bytes)                      |
/// +                                                               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Family             |            Padding            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct IpAddr {
    /// Address bytes. Only the first four are significant for IPv4.
    pub addr: [u8; 16],
    /// Address family tag; see the `FAMILY_*` constants.
    pub family: u16,
    /// Reserved.
    pub pad: u16,
}

/// The header of every request. It is always followed by zero padding up to
/// [`RequestPacket::PACKED_SIZE_BYTES`], regardless of the command.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Version    |   Pkt Type    |     Res1      |     Res2      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Command            |            Attempt            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Sequence Number                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// .                     Zero padding (396 bytes)                  .
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct RequestPacket {
    /// Protocol revision the request is written in.
    pub version: ProtocolVersion,
    /// Always [`PacketType::REQUEST`] for packets built by a client.
    pub pkt_type: PacketType,
    /// Reserved.
    pub res1: u8,
    /// Reserved.
    pub res2: u8,
    /// Which command is being issued.
    pub command: Command,
    /// How many resends the client has done for this sequence number.
    pub attempt: u16,
    /// Client's sequence number. Zero means "not yet assigned".
    pub sequence: u32,
}

/// The fixed header at the start of every reply. The command-specific body
/// follows immediately in the same datagram.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Version    |   Pkt Type    |     Res1      |     Res2      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Command            |             Reply             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Status             |             Pad1              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |             Pad2              |             Pad3              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Sequence Number                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Pad4                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Pad5                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ReplyHeader {
    /// Protocol revision of the reply.
    pub version: ProtocolVersion,
    /// Should be [`PacketType::REPLY`].
    pub pkt_type: PacketType,
    /// Reserved.
    pub res1: u8,
    /// Reserved.
    pub res2: u8,
    /// Command echoed from the request.
    pub command: Command,
    /// Layout of the body that follows.
    pub reply: ReplyCode,
    /// Outcome of the command.
    pub status: Status,
    /// Reserved.
    pub pad1: u16,
    /// Reserved.
    pub pad2: u16,
    /// Reserved.
    pub pad3: u16,
    /// Sequence number echoed from the request.
    pub sequence: u32,
    /// Reserved.
    pub pad4: u32,
    /// Reserved.
    pub pad5: u32,
}

/// Body of a tracking reply: the state of the system clock and its
/// currently selected reference source.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TrackingPayload {
    /// Reference ID of the selected source.
    pub ref_id: u32,
    /// Address of the selected source (unspecified for reference clocks).
    pub ip_addr: IpAddr,
    /// Distance in hops from a primary reference.
    pub stratum: u16,
    /// Raw leap status code; see [`TrackingPayload::leap`].
    pub leap_status: u16,
    /// Time of the last measurement from the reference source.
    pub ref_time: Timespec,
    /// Current offset between the system clock and true time (seconds).
    pub current_correction: ChronyFloat,
    /// Offset measured on the last clock update (seconds).
    pub last_offset: ChronyFloat,
    /// Long-term average of the offset (seconds).
    pub rms_offset: ChronyFloat,
    /// Rate at which the system clock would drift if uncorrected (ppm).
    pub freq_ppm: ChronyFloat,
    /// Residual frequency of the selected source (ppm).
    pub resid_freq_ppm: ChronyFloat,
    /// Estimated error bound on the frequency (ppm).
    pub skew_ppm: ChronyFloat,
    /// Total network path delay to the stratum-1 computer (seconds).
    pub root_delay: ChronyFloat,
    /// Total accumulated dispersion to the stratum-1 computer (seconds).
    pub root_dispersion: ChronyFloat,
    /// Interval between the last two clock updates (seconds).
    pub last_update_interval: ChronyFloat,
}

/// Body of an activity reply: how many sources are in each state.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ActivityPayload {
    /// Sources that are online.
    pub online: i32,
    /// Sources that are offline.
    pub offline: i32,
    /// Sources doing a burst and returning to online afterwards.
    pub burst_online: i32,
    /// Sources doing a burst and returning to offline afterwards.
    pub burst_offline: i32,
    /// Sources whose address is not resolved yet.
    pub unresolved: i32,
}

/// Body of an `n_sources` reply.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SourceCountPayload {
    /// Number of configured sources.
    pub n_sources: u32,
}

/// A decoded reply body, selected by the reply's command.
#[cfg(feature = "alloc")]
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyBody {
    /// The reply to a [`Command::NULL`] probe carries no body.
    Null,
    /// Reply to [`Command::TRACKING`].
    Tracking(TrackingPayload),
    /// Reply to [`Command::ACTIVITY`].
    Activity(ActivityPayload),
    /// Reply to [`Command::N_SOURCES`].
    SourceCount(SourceCountPayload),
    /// Undecoded bytes following the header of a reply to any other command.
    Unknown(alloc::vec::Vec<u8>),
}

// Inherent implementations.

impl ProtocolVersion {
    /// Protocol revision 5 (chrony 2.x).
    pub const V5: Self = ProtocolVersion(5);
    /// Protocol revision 6 (chrony 3.x and later).
    pub const V6: Self = ProtocolVersion(6);

    /// Revisions this crate can speak, most preferred first.
    pub const SUPPORTED: [Self; 2] = [Self::V6, Self::V5];

    /// Returns the raw revision number.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether this revision is one of [`ProtocolVersion::SUPPORTED`].
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl PacketType {
    /// Sent by clients.
    pub const REQUEST: Self = PacketType(1);
    /// Sent by the daemon.
    pub const REPLY: Self = PacketType(2);
}

impl Command {
    /// No-op command, used to probe the protocol revision.
    pub const NULL: Self = Command(0);
    /// Number of configured sources.
    pub const N_SOURCES: Self = Command(14);
    /// System clock tracking state.
    pub const TRACKING: Self = Command(33);
    /// Per-source statistics (not decoded by this crate).
    pub const SOURCE_STATS: Self = Command(34);
    /// Number of sources in each activity state.
    pub const ACTIVITY: Self = Command(44);

    /// Whether [`ReplyBody::decode`] has a dedicated layout for this command.
    pub fn is_known(&self) -> bool {
        matches!(
            *self,
            Command::NULL | Command::N_SOURCES | Command::TRACKING | Command::ACTIVITY
        )
    }
}

impl ReplyCode {
    /// Header-only reply.
    pub const NULL: Self = ReplyCode(1);
    /// Number of sources.
    pub const N_SOURCES: Self = ReplyCode(2);
    /// Tracking state.
    pub const TRACKING: Self = ReplyCode(5);
    /// Activity counts.
    pub const ACTIVITY: Self = ReplyCode(12);
}

impl Status {
    /// The command succeeded.
    pub const SUCCESS: Self = Status(0);
    /// The command failed.
    pub const FAILED: Self = Status(1);
    /// The command requires authorisation.
    pub const UNAUTH: Self = Status(2);
    /// The command is invalid.
    pub const INVALID: Self = Status(3);
    /// No such source.
    pub const NO_SUCH_SOURCE: Self = Status(4);
    /// Invalid timestamp.
    pub const INVALID_TS: Self = Status(5);
    /// The facility is not enabled.
    pub const NOT_ENABLED: Self = Status(6);
    /// Bad subnet.
    pub const BAD_SUBNET: Self = Status(7);
    /// Access allowed.
    pub const ACCESS_ALLOWED: Self = Status(8);
    /// Access denied.
    pub const ACCESS_DENIED: Self = Status(9);
    /// No host access.
    pub const NO_HOST_ACCESS: Self = Status(10);
    /// The source is already known.
    pub const SOURCE_ALREADY_KNOWN: Self = Status(11);
    /// Too many sources are configured.
    pub const TOO_MANY_SOURCES: Self = Status(12);
    /// No RTC support.
    pub const NO_RTC: Self = Status(13);
    /// Bad RTC file.
    pub const BAD_RTC_FILE: Self = Status(14);
    /// The facility is inactive.
    pub const INACTIVE: Self = Status(15);
    /// Bad sample.
    pub const BAD_SAMPLE: Self = Status(16);
    /// Invalid address family.
    pub const INVALID_AF: Self = Status(17);
    /// The daemon does not speak the request's protocol revision.
    pub const BAD_PKT_VERSION: Self = Status(18);
    /// The request had the wrong length.
    pub const BAD_PKT_LENGTH: Self = Status(19);
    /// Invalid name.
    pub const INVALID_NAME: Self = Status(21);

    /// Whether the daemon reported success.
    pub fn is_success(&self) -> bool {
        *self == Status::SUCCESS
    }

    /// The name of a known status code.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "success",
            1 => "failed",
            2 => "unauthorised",
            3 => "invalid command",
            4 => "no such source",
            5 => "invalid timestamp",
            6 => "not enabled",
            7 => "bad subnet",
            8 => "access allowed",
            9 => "access denied",
            10 => "no host access",
            11 => "source already known",
            12 => "too many sources",
            13 => "no RTC",
            14 => "bad RTC file",
            15 => "inactive",
            16 => "bad sample",
            17 => "invalid address family",
            18 => "bad packet version",
            19 => "bad packet length",
            21 => "invalid name",
            _ => return None,
        };
        Some(name)
    }
}

impl IpAddr {
    /// Unspecified family; the address is all zeroes.
    pub const FAMILY_UNSPEC: u16 = 0;
    /// IPv4: only the first four bytes are significant.
    pub const FAMILY_INET4: u16 = 1;
    /// IPv6: all sixteen bytes form the address.
    pub const FAMILY_INET6: u16 = 2;

    /// Convert to a standard library address.
    ///
    /// IPv4 when the family tag says so; otherwise all 16 bytes are taken as
    /// an IPv6 address.
    pub fn to_ip(&self) -> NetIpAddr {
        if self.family == Self::FAMILY_INET4 {
            let [a, b, c, d, ..] = self.addr;
            NetIpAddr::V4(Ipv4Addr::new(a, b, c, d))
        } else {
            NetIpAddr::V6(Ipv6Addr::from(self.addr))
        }
    }

    /// Whether this is the unspecified address of its family.
    pub fn is_unspecified(&self) -> bool {
        self.to_ip().is_unspecified()
    }
}

impl From<NetIpAddr> for IpAddr {
    fn from(ip: NetIpAddr) -> Self {
        let mut addr = [0u8; 16];
        let family = match ip {
            NetIpAddr::V4(v4) => {
                addr[..4].copy_from_slice(&v4.octets());
                Self::FAMILY_INET4
            }
            NetIpAddr::V6(v6) => {
                addr.copy_from_slice(&v6.octets());
                Self::FAMILY_INET6
            }
        };
        IpAddr {
            addr,
            family,
            pad: 0,
        }
    }
}

impl RequestPacket {
    /// Size of the meaningful header fields at the front of every request.
    pub const HEADER_SIZE_BYTES: usize = 12;
    /// Zero padding appended after the header.
    pub const PADDING_BYTES: usize = 396;

    /// A request for `command` at protocol revision `version`, with no
    /// sequence number assigned yet.
    pub fn new(version: ProtocolVersion, command: Command) -> Self {
        RequestPacket {
            version,
            pkt_type: PacketType::REQUEST,
            res1: 0,
            res2: 0,
            command,
            attempt: 0,
            sequence: 0,
        }
    }
}

impl TrackingPayload {
    /// The leap status, if the code is one chronyd defines.
    pub fn leap(&self) -> Option<LeapStatus> {
        LeapStatus::try_from(self.leap_status).ok()
    }
}

// Size implementations.

impl ConstPackedSizeBytes for IpAddr {
    const PACKED_SIZE_BYTES: usize = 20;
}

impl ConstPackedSizeBytes for RequestPacket {
    const PACKED_SIZE_BYTES: usize = Self::HEADER_SIZE_BYTES + Self::PADDING_BYTES;
}

impl ConstPackedSizeBytes for ReplyHeader {
    const PACKED_SIZE_BYTES: usize = 28;
}

impl ConstPackedSizeBytes for TrackingPayload {
    const PACKED_SIZE_BYTES: usize = 4
        + IpAddr::PACKED_SIZE_BYTES
        + 2
        + 2
        + Timespec::PACKED_SIZE_BYTES
        + ChronyFloat::PACKED_SIZE_BYTES * 9;
}

impl ConstPackedSizeBytes for ActivityPayload {
    const PACKED_SIZE_BYTES: usize = 20;
}

impl ConstPackedSizeBytes for SourceCountPayload {
    const PACKED_SIZE_BYTES: usize = 4;
}

// Default implementations.

impl Default for ProtocolVersion {
    /// Defaults to the newest supported revision.
    fn default() -> Self {
        ProtocolVersion::V6
    }
}

impl Default for RequestPacket {
    /// A [`Command::NULL`] request at the default revision.
    fn default() -> Self {
        RequestPacket::new(ProtocolVersion::default(), Command::NULL)
    }
}

impl Default for ReplyHeader {
    /// A successful, header-only reply at the default revision.
    fn default() -> Self {
        ReplyHeader {
            version: ProtocolVersion::default(),
            pkt_type: PacketType::REPLY,
            res1: 0,
            res2: 0,
            command: Command::NULL,
            reply: ReplyCode::NULL,
            status: Status::SUCCESS,
            pad1: 0,
            pad2: 0,
            pad3: 0,
            sequence: 0,
            pad4: 0,
            pad5: 0,
        }
    }
}

// Display implementations.

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "unknown status ({})", self.0),
        }
    }
}

impl fmt::Display for IpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ip())
    }
}

impl fmt::Display for TrackingPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reference ID: {:08X} ({}), Stratum: {}, Ref time: {}.{:09}, \
             Current correction: {:.9}, Last offset: {:.9}, RMS offset: {:.9}, \
             Frequency: {:.3} ppm, Residual freq: {:.3} ppm, Skew: {:.3} ppm, \
             Root delay: {:.9}, Root dispersion: {:.9}, Update interval: {:.1}, \
             Leap status: {}",
            self.ref_id,
            self.ip_addr,
            self.stratum,
            self.ref_time.epoch_seconds(),
            self.ref_time.subsec_nanos(),
            self.current_correction.to_f64(),
            self.last_offset.to_f64(),
            self.rms_offset.to_f64(),
            self.freq_ppm.to_f64(),
            self.resid_freq_ppm.to_f64(),
            self.skew_ppm.to_f64(),
            self.root_delay.to_f64(),
            self.root_dispersion.to_f64(),
            self.last_update_interval.to_f64(),
            self.leap_status,
        )
    }
}

impl fmt::Display for ActivityPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sources online, {} sources offline, {} sources doing burst (return to online), \
             {} sources doing burst (return to offline), {} sources with unknown address",
            self.online, self.offline, self.burst_online, self.burst_offline, self.unresolved
        )
    }
}
