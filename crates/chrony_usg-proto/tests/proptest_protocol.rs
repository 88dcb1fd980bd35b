use chrony_proto::float::ChronyFloat;
use chrony_proto::protocol::{
    ActivityPayload, Command, ConstPackedSizeBytes, FromBytes, IpAddr, PacketType,
    ProtocolVersion, ReadBytes, ReplyBody, ReplyHeader, RequestPacket, ToBytes, TrackingPayload,
    WriteBytes,
};
use std::io::Cursor;
use chrony_proto::timespec::{MAX_NANOS, Timespec};
use proptest::prelude::*;

proptest! {
    #[test]
    fn request_encode_decode_identical(
        version in any::<u8>(),
        command in any::<u16>(),
        attempt in any::<u16>(),
        sequence in any::<u32>(),
    ) {
        let req = RequestPacket {
            attempt,
            sequence,
            ..RequestPacket::new(ProtocolVersion(version), Command(command))
        };
        prop_assert_eq!(req.pkt_type, PacketType::REQUEST);

        let mut buf = [0xffu8; RequestPacket::PACKED_SIZE_BYTES];
        prop_assert_eq!(req.to_bytes(&mut buf).unwrap(), 408);
        prop_assert!(buf[RequestPacket::HEADER_SIZE_BYTES..].iter().all(|&b| b == 0));
        let (decoded, n) = RequestPacket::from_bytes(&buf).unwrap();
        prop_assert_eq!(n, 408);
        prop_assert_eq!(decoded, req);

        let mut written = Vec::new();
        written.write_bytes(req).unwrap();
        prop_assert_eq!(&written[..], &buf[..]);
        let mut cursor = Cursor::new(&written);
        let read: RequestPacket = cursor.read_bytes().unwrap();
        prop_assert_eq!(cursor.position(), 408);
        prop_assert_eq!(read, req);
    }

    #[test]
    fn float_encode_decode_within_one_ulp(value in -1.0e6f64..1.0e6f64) {
        prop_assume!(value.abs() > 1.0e-20);
        let decoded = ChronyFloat::from_f64(value).to_f64();
        // 24 magnitude bits in the coefficient.
        let tolerance = value.abs() * 2f64.powi(-23);
        prop_assert!((decoded - value).abs() <= tolerance, "{} decoded as {}", value, decoded);
    }

    #[test]
    fn float_decode_is_finite(raw in any::<i32>()) {
        let v = ChronyFloat(raw).to_f64();
        prop_assert!(v.is_finite());
        prop_assert_eq!(ChronyFloat(raw).to_fixed(), (v * 1e9) as i64);
    }

    #[test]
    fn float_zero_coefficient_is_zero(exp in 0u32..128) {
        prop_assert_eq!(ChronyFloat((exp << 25) as i32).to_f64(), 0.0);
    }

    #[test]
    fn timespec_nanos_never_exceed_max(high in any::<u32>(), low in any::<u32>(), nsec in any::<u32>()) {
        let ts = Timespec { sec_high: high, sec_low: low, nsec };
        prop_assert!(ts.subsec_nanos() <= MAX_NANOS);
        prop_assert_eq!(ts.epoch_seconds() & 0xffff_ffff, low as u64);
    }

    #[test]
    fn ip_addr_ipv4_roundtrip(octets in any::<[u8; 4]>()) {
        let std_ip = std::net::IpAddr::from(octets);
        let ip = IpAddr::from(std_ip);
        let mut buf = [0u8; 20];
        ip.to_bytes(&mut buf).unwrap();
        let (parsed, _) = IpAddr::from_bytes(&buf).unwrap();
        prop_assert_eq!(parsed.to_ip(), std_ip);
    }

    /// Any 28 bytes parse as a header; shorter buffers never do.
    #[test]
    fn reply_header_from_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let res = ReplyHeader::from_bytes(&bytes);
        if bytes.len() >= ReplyHeader::PACKED_SIZE_BYTES {
            let (header, _) = res.unwrap();
            let mut buf = [0u8; 28];
            header.to_bytes(&mut buf).unwrap();
            prop_assert_eq!(&buf[..], &bytes[..28]);
        } else {
            prop_assert!(res.is_err());
        }
    }

    #[test]
    fn tracking_from_arbitrary_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let res = TrackingPayload::from_bytes(&bytes);
        prop_assert_eq!(res.is_ok(), bytes.len() >= TrackingPayload::PACKED_SIZE_BYTES);
    }

    #[test]
    fn activity_roundtrip(a in any::<i32>(), b in any::<i32>(), c in any::<i32>(), d in any::<i32>(), e in any::<i32>()) {
        let activity = ActivityPayload { online: a, offline: b, burst_online: c, burst_offline: d, unresolved: e };
        let mut buf = [0u8; 20];
        activity.to_bytes(&mut buf).unwrap();
        let (parsed, _) = ActivityPayload::from_bytes(&buf).unwrap();
        prop_assert_eq!(parsed, activity);
    }

    #[test]
    fn unknown_commands_keep_payload(code in 45u16.., bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let (body, n) = ReplyBody::decode(Command(code), &bytes).unwrap();
        prop_assert_eq!(n, bytes.len());
        prop_assert_eq!(body, ReplyBody::Unknown(bytes));
    }
}
