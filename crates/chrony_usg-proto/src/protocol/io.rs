use byteorder::{BE, ReadBytesExt, WriteBytesExt};
use std::io;

use super::{
    ActivityPayload, Command, IpAddr, PacketType, ProtocolVersion, ReadBytes, ReadFromBytes,
    ReplyCode, ReplyHeader, RequestPacket, SourceCountPayload, Status, TrackingPayload,
    WriteBytes, WriteToBytes,
};
use crate::float::ChronyFloat;
use crate::timespec::Timespec;

// Writer implementations.

impl<W> WriteBytes for W
where
    W: WriteBytesExt,
{
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()> {
        protocol.write_to_bytes(self)
    }
}

impl<P> WriteToBytes for &P
where
    P: WriteToBytes,
{
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()> {
        (*self).write_to_bytes(writer)
    }
}

impl WriteToBytes for ChronyFloat {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BE>(self.0)?;
        Ok(())
    }
}

impl WriteToBytes for Timespec {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BE>(self.sec_high)?;
        writer.write_u32::<BE>(self.sec_low)?;
        writer.write_u32::<BE>(self.nsec)?;
        Ok(())
    }
}

impl WriteToBytes for IpAddr {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.addr)?;
        writer.write_u16::<BE>(self.family)?;
        writer.write_u16::<BE>(self.pad)?;
        Ok(())
    }
}

impl WriteToBytes for RequestPacket {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.version.0)?;
        writer.write_u8(self.pkt_type.0)?;
        writer.write_u8(self.res1)?;
        writer.write_u8(self.res2)?;
        writer.write_u16::<BE>(self.command.0)?;
        writer.write_u16::<BE>(self.attempt)?;
        writer.write_u32::<BE>(self.sequence)?;
        writer.write_all(&[0u8; RequestPacket::PADDING_BYTES])?;
        Ok(())
    }
}

impl WriteToBytes for ReplyHeader {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.version.0)?;
        writer.write_u8(self.pkt_type.0)?;
        writer.write_u8(self.res1)?;
        writer.write_u8(self.res2)?;
        writer.write_u16::<BE>(self.command.0)?;
        writer.write_u16::<BE>(self.reply.0)?;
        writer.write_u16::<BE>(self.status.0)?;
        writer.write_u16::<BE>(self.pad1)?;
        writer.write_u16::<BE>(self.pad2)?;
        writer.write_u16::<BE>(self.pad3)?;
        writer.write_u32::<BE>(self.sequence)?;
        writer.write_u32::<BE>(self.pad4)?;
        writer.write_u32::<BE>(self.pad5)?;
        Ok(())
    }
}

impl WriteToBytes for TrackingPayload {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BE>(self.ref_id)?;
        writer.write_bytes(self.ip_addr)?;
        writer.write_u16::<BE>(self.stratum)?;
        writer.write_u16::<BE>(self.leap_status)?;
        writer.write_bytes(self.ref_time)?;
        writer.write_bytes(self.current_correction)?;
        writer.write_bytes(self.last_offset)?;
        writer.write_bytes(self.rms_offset)?;
        writer.write_bytes(self.freq_ppm)?;
        writer.write_bytes(self.resid_freq_ppm)?;
        writer.write_bytes(self.skew_ppm)?;
        writer.write_bytes(self.root_delay)?;
        writer.write_bytes(self.root_dispersion)?;
        writer.write_bytes(self.last_update_interval)?;
        Ok(())
    }
}

impl WriteToBytes for ActivityPayload {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BE>(self.online)?;
        writer.write_i32::<BE>(self.offline)?;
        writer.write_i32::<BE>(self.burst_online)?;
        writer.write_i32::<BE>(self.burst_offline)?;
        writer.write_i32::<BE>(self.unresolved)?;
        Ok(())
    }
}

impl WriteToBytes for SourceCountPayload {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BE>(self.n_sources)?;
        Ok(())
    }
}

// Reader implementations.

impl<R> ReadBytes for R
where
    R: ReadBytesExt,
{
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P> {
        P::read_from_bytes(self)
    }
}

impl ReadFromBytes for ChronyFloat {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        Ok(ChronyFloat(reader.read_i32::<BE>()?))
    }
}

impl ReadFromBytes for Timespec {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let sec_high = reader.read_u32::<BE>()?;
        let sec_low = reader.read_u32::<BE>()?;
        let nsec = reader.read_u32::<BE>()?;
        Ok(Timespec {
            sec_high,
            sec_low,
            nsec,
        })
    }
}

impl ReadFromBytes for IpAddr {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let mut addr = [0u8; 16];
        reader.read_exact(&mut addr)?;
        let family = reader.read_u16::<BE>()?;
        let pad = reader.read_u16::<BE>()?;
        Ok(IpAddr { addr, family, pad })
    }
}

impl ReadFromBytes for RequestPacket {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let version = ProtocolVersion(reader.read_u8()?);
        let pkt_type = PacketType(reader.read_u8()?);
        let res1 = reader.read_u8()?;
        let res2 = reader.read_u8()?;
        let command = Command(reader.read_u16::<BE>()?);
        let attempt = reader.read_u16::<BE>()?;
        let sequence = reader.read_u32::<BE>()?;
        let mut padding = [0u8; RequestPacket::PADDING_BYTES];
        reader.read_exact(&mut padding)?;
        Ok(RequestPacket {
            version,
            pkt_type,
            res1,
            res2,
            command,
            attempt,
            sequence,
        })
    }
}

impl ReadFromBytes for ReplyHeader {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let version = ProtocolVersion(reader.read_u8()?);
        let pkt_type = PacketType(reader.read_u8()?);
        let res1 = reader.read_u8()?;
        let res2 = reader.read_u8()?;
        let command = Command(reader.read_u16::<BE>()?);
        let reply = ReplyCode(reader.read_u16::<BE>()?);
        let status = Status(reader.read_u16::<BE>()?);
        let pad1 = reader.read_u16::<BE>()?;
        let pad2 = reader.read_u16::<BE>()?;
        let pad3 = reader.read_u16::<BE>()?;
        let sequence = reader.read_u32::<BE>()?;
        let pad4 = reader.read_u32::<BE>()?;
        let pad5 = reader.read_u32::<BE>()?;
        Ok(ReplyHeader {
            version,
            pkt_type,
            res1,
            res2,
            command,
            reply,
            status,
            pad1,
            pad2,
            pad3,
            sequence,
            pad4,
            pad5,
        })
    }
}

impl ReadFromBytes for TrackingPayload {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let ref_id = reader.read_u32::<BE>()?;
        let ip_addr = reader.read_bytes()?;
        let stratum = reader.read_u16::<BE>()?;
        let leap_status = reader.read_u16::<BE>()?;
        let ref_time = reader.read_bytes()?;
        Ok(TrackingPayload {
            ref_id,
            ip_addr,
            stratum,
            leap_status,
            ref_time,
            current_correction: reader.read_bytes()?,
            last_offset: reader.read_bytes()?,
            rms_offset: reader.read_bytes()?,
            freq_ppm: reader.read_bytes()?,
            resid_freq_ppm: reader.read_bytes()?,
            skew_ppm: reader.read_bytes()?,
            root_delay: reader.read_bytes()?,
            root_dispersion: reader.read_bytes()?,
            last_update_interval: reader.read_bytes()?,
        })
    }
}

impl ReadFromBytes for ActivityPayload {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        Ok(ActivityPayload {
            online: reader.read_i32::<BE>()?,
            offline: reader.read_i32::<BE>()?,
            burst_online: reader.read_i32::<BE>()?,
            burst_offline: reader.read_i32::<BE>()?,
            unresolved: reader.read_i32::<BE>()?,
        })
    }
}

impl ReadFromBytes for SourceCountPayload {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        Ok(SourceCountPayload {
            n_sources: reader.read_u32::<BE>()?,
        })
    }
}
