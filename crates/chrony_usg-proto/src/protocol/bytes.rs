use crate::error::{ParseError, ensure_len};
use crate::float::ChronyFloat;
use crate::timespec::Timespec;

#[cfg(feature = "alloc")]
use super::ReplyBody;
use super::{
    ActivityPayload, Command, ConstPackedSizeBytes, FromBytes, IpAddr, PacketType,
    ProtocolVersion, ReplyCode, ReplyHeader, RequestPacket, SourceCountPayload, Status, ToBytes,
    TrackingPayload,
};

fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn be_i32(buf: &[u8], offset: usize) -> i32 {
    be_u32(buf, offset) as i32
}

impl FromBytes for ChronyFloat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        Ok((ChronyFloat(be_i32(buf, 0)), Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for Timespec {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let ts = Timespec {
            sec_high: be_u32(buf, 0),
            sec_low: be_u32(buf, 4),
            nsec: be_u32(buf, 8),
        };
        Ok((ts, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for IpAddr {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let mut addr = [0u8; 16];
        addr.copy_from_slice(&buf[..16]);
        let ip = IpAddr {
            addr,
            family: be_u16(buf, 16),
            pad: be_u16(buf, 18),
        };
        Ok((ip, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for RequestPacket {
    /// Parses the header fields. The padding must be present but its content
    /// is not checked.
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let packet = RequestPacket {
            version: ProtocolVersion(buf[0]),
            pkt_type: PacketType(buf[1]),
            res1: buf[2],
            res2: buf[3],
            command: Command(be_u16(buf, 4)),
            attempt: be_u16(buf, 6),
            sequence: be_u32(buf, 8),
        };
        Ok((packet, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for ReplyHeader {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let header = ReplyHeader {
            version: ProtocolVersion(buf[0]),
            pkt_type: PacketType(buf[1]),
            res1: buf[2],
            res2: buf[3],
            command: Command(be_u16(buf, 4)),
            reply: ReplyCode(be_u16(buf, 6)),
            status: Status(be_u16(buf, 8)),
            pad1: be_u16(buf, 10),
            pad2: be_u16(buf, 12),
            pad3: be_u16(buf, 14),
            sequence: be_u32(buf, 16),
            pad4: be_u32(buf, 20),
            pad5: be_u32(buf, 24),
        };
        Ok((header, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for TrackingPayload {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;

        let mut offset = 0;

        let ref_id = be_u32(buf, offset);
        offset += 4;

        let (ip_addr, n) = IpAddr::from_bytes(&buf[offset..])?;
        offset += n;

        let stratum = be_u16(buf, offset);
        offset += 2;

        let leap_status = be_u16(buf, offset);
        offset += 2;

        let (ref_time, n) = Timespec::from_bytes(&buf[offset..])?;
        offset += n;

        let mut floats = [ChronyFloat::default(); 9];
        for f in floats.iter_mut() {
            let (value, n) = ChronyFloat::from_bytes(&buf[offset..])?;
            *f = value;
            offset += n;
        }
        let [
            current_correction,
            last_offset,
            rms_offset,
            freq_ppm,
            resid_freq_ppm,
            skew_ppm,
            root_delay,
            root_dispersion,
            last_update_interval,
        ] = floats;

        Ok((
            TrackingPayload {
                ref_id,
                ip_addr,
                stratum,
                leap_status,
                ref_time,
                current_correction,
                last_offset,
                rms_offset,
                freq_ppm,
                resid_freq_ppm,
                skew_ppm,
                root_delay,
                root_dispersion,
                last_update_interval,
            },
            offset,
        ))
    }
}

impl FromBytes for ActivityPayload {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let activity = ActivityPayload {
            online: be_i32(buf, 0),
            offline: be_i32(buf, 4),
            burst_online: be_i32(buf, 8),
            burst_offline: be_i32(buf, 12),
            unresolved: be_i32(buf, 16),
        };
        Ok((activity, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for SourceCountPayload {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        Ok((
            SourceCountPayload {
                n_sources: be_u32(buf, 0),
            },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

#[cfg(feature = "alloc")]
impl ReplyBody {
    /// Decode the body that follows a reply header, selecting the layout by
    /// the header's `command`.
    ///
    /// Returns the body and the number of bytes consumed. A [`Command::NULL`]
    /// reply consumes nothing; any command without a dedicated layout takes
    /// the whole remainder as [`ReplyBody::Unknown`]. Trailing bytes after a
    /// known layout are left unconsumed.
    pub fn decode(command: Command, buf: &[u8]) -> Result<(Self, usize), ParseError> {
        match command {
            Command::NULL => Ok((ReplyBody::Null, 0)),
            Command::TRACKING => {
                let (payload, n) = TrackingPayload::from_bytes(buf)?;
                Ok((ReplyBody::Tracking(payload), n))
            }
            Command::ACTIVITY => {
                let (payload, n) = ActivityPayload::from_bytes(buf)?;
                Ok((ReplyBody::Activity(payload), n))
            }
            Command::N_SOURCES => {
                let (payload, n) = SourceCountPayload::from_bytes(buf)?;
                Ok((ReplyBody::SourceCount(payload), n))
            }
            _ => Ok((ReplyBody::Unknown(buf.to_vec()), buf.len())),
        }
    }
}

// Buffer-based writer implementations (io-independent).

impl ToBytes for ChronyFloat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[..4].copy_from_slice(&self.0.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for Timespec {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[..4].copy_from_slice(&self.sec_high.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sec_low.to_be_bytes());
        buf[8..12].copy_from_slice(&self.nsec.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for IpAddr {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[..16].copy_from_slice(&self.addr);
        buf[16..18].copy_from_slice(&self.family.to_be_bytes());
        buf[18..20].copy_from_slice(&self.pad.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for RequestPacket {
    /// Always writes the full padded request, zeroing the padding.
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[0] = self.version.0;
        buf[1] = self.pkt_type.0;
        buf[2] = self.res1;
        buf[3] = self.res2;
        buf[4..6].copy_from_slice(&self.command.0.to_be_bytes());
        buf[6..8].copy_from_slice(&self.attempt.to_be_bytes());
        buf[8..12].copy_from_slice(&self.sequence.to_be_bytes());
        buf[Self::HEADER_SIZE_BYTES..Self::PACKED_SIZE_BYTES].fill(0);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for ReplyHeader {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[0] = self.version.0;
        buf[1] = self.pkt_type.0;
        buf[2] = self.res1;
        buf[3] = self.res2;
        buf[4..6].copy_from_slice(&self.command.0.to_be_bytes());
        buf[6..8].copy_from_slice(&self.reply.0.to_be_bytes());
        buf[8..10].copy_from_slice(&self.status.0.to_be_bytes());
        buf[10..12].copy_from_slice(&self.pad1.to_be_bytes());
        buf[12..14].copy_from_slice(&self.pad2.to_be_bytes());
        buf[14..16].copy_from_slice(&self.pad3.to_be_bytes());
        buf[16..20].copy_from_slice(&self.sequence.to_be_bytes());
        buf[20..24].copy_from_slice(&self.pad4.to_be_bytes());
        buf[24..28].copy_from_slice(&self.pad5.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for TrackingPayload {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;

        let mut offset = 0;

        buf[..4].copy_from_slice(&self.ref_id.to_be_bytes());
        offset += 4;
        offset += self.ip_addr.to_bytes(&mut buf[offset..])?;
        buf[offset..offset + 2].copy_from_slice(&self.stratum.to_be_bytes());
        offset += 2;
        buf[offset..offset + 2].copy_from_slice(&self.leap_status.to_be_bytes());
        offset += 2;
        offset += self.ref_time.to_bytes(&mut buf[offset..])?;
        for f in [
            self.current_correction,
            self.last_offset,
            self.rms_offset,
            self.freq_ppm,
            self.resid_freq_ppm,
            self.skew_ppm,
            self.root_delay,
            self.root_dispersion,
            self.last_update_interval,
        ] {
            offset += f.to_bytes(&mut buf[offset..])?;
        }

        Ok(offset)
    }
}

impl ToBytes for ActivityPayload {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let counters = [
            self.online,
            self.offline,
            self.burst_online,
            self.burst_offline,
            self.unresolved,
        ];
        for (i, c) in counters.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&c.to_be_bytes());
        }
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for SourceCountPayload {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[..4].copy_from_slice(&self.n_sources.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}
