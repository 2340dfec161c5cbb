//! Hamilton telemetry datagram decoding
//!
//! # Wire Layout
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬──────────────┬──────────────┐
//! │ Echo seq │ Accel   │ µAccel   │ Temperature  │ Device time  │
//! │ u32 LE   │ 3 × i8  │ 3 × i8   │ i32 LE       │ u32 LE       │
//! │ [0..4)   │ [4..7)  │ [7..10)  │ [10..14)     │ [14..18)     │
//! └──────────┴─────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! The serial number is not in the payload: sensors are addressed by their
//! mesh address, so it comes from the two low-order bytes of the source IP.
//! Anything past byte 18 is ignored.

use crate::error::{Error, Result};
use std::net::{IpAddr, SocketAddr};

/// Reference instant shared by acks and device timestamps: 2016-01-01T00:00:00Z (ms)
pub const EPOCH_MS: u64 = 1_451_606_400_000;

/// Fixed telemetry layout size
pub const MIN_PACKET_LEN: usize = 18;

/// Temperature unit: 1/10000 of a degree Celsius
const TEMPERATURE_SCALE: f64 = 10_000.0;

/// Serial reported by the demo generator
pub const DEMO_SERIAL: u16 = 0xFFFF;

/// One decoded accelerometer reading, ready for publication.
///
/// Optional fields are always present on decoded packets and absent on
/// synthetic demo readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Numeric serial (two low-order address bytes)
    pub serial: u16,
    /// Serial as 4 hex digits, used in the publish topic
    pub serial_id: String,
    /// Acceleration x, y, z
    pub acceleration: [i8; 3],
    /// Micro-acceleration x, y, z
    pub micro_acceleration: Option<[i8; 3]>,
    /// Temperature in 1/10000 °C
    pub raw_temperature: Option<i32>,
    /// Temperature in °F derived from `raw_temperature`
    pub temperature_f: Option<f64>,
    /// Device timestamp reconstructed against [`EPOCH_MS`]
    pub device_timestamp: Option<u64>,
}

/// Decoder output: the reading plus the echo sequence used for dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    /// First four bytes as a little-endian sequence number
    pub echo_seq: u32,
    /// Decoded sensor values
    pub reading: Reading,
}

/// Decode a telemetry datagram received from `source`.
///
/// Rejects payloads shorter than [`MIN_PACKET_LEN`]; nothing else is
/// validated since every bit pattern is a legal field value.
pub fn decode(payload: &[u8], source: SocketAddr) -> Result<DecodedPacket> {
    if payload.len() < MIN_PACKET_LEN {
        return Err(Error::PacketTooShort {
            len: payload.len(),
            min: MIN_PACKET_LEN,
        });
    }

    let echo_seq = read_u32_le(payload, 0);
    let acceleration = read_i8x3(payload, 4);
    let micro_acceleration = read_i8x3(payload, 7);
    let raw_temperature = read_u32_le(payload, 10) as i32;
    let device_seconds = read_u32_le(payload, 14);

    let serial = serial_from_addr(source.ip());

    Ok(DecodedPacket {
        echo_seq,
        reading: Reading {
            serial,
            serial_id: format_serial(serial),
            acceleration,
            micro_acceleration: Some(micro_acceleration),
            raw_temperature: Some(raw_temperature),
            temperature_f: Some(fahrenheit(raw_temperature)),
            device_timestamp: Some(device_timestamp(device_seconds)),
        },
    })
}

/// Two low-order bytes of the address as a big-endian u16.
///
/// IPv4 sources use their last two octets, which are the same bytes the
/// IPv4-mapped IPv6 form carries at positions 14 and 15.
pub fn serial_from_addr(ip: IpAddr) -> u16 {
    match ip {
        IpAddr::V6(v6) => {
            let o = v6.octets();
            u16::from_be_bytes([o[14], o[15]])
        }
        IpAddr::V4(v4) => {
            let o = v4.octets();
            u16::from_be_bytes([o[2], o[3]])
        }
    }
}

/// Zero-padded lowercase hex, e.g. `0x0a1f` -> `"0a1f"`
pub fn format_serial(serial: u16) -> String {
    format!("{:04x}", serial)
}

/// Convert 1/10000 °C to °F
#[inline]
pub fn fahrenheit(raw_temperature: i32) -> f64 {
    (raw_temperature as f64 / TEMPERATURE_SCALE) * 1.8 + 32.0
}

/// Device seconds to the published timestamp: `(secs × 100 + EPOCH_MS) × 1e6`.
///
/// The ×100 follows the 0.1 s tick convention of the acknowledgment. Kept
/// separate from [`crate::ingest::ack::coarse_timestamp`], which rounds the
/// other way; downstream consumers depend on this exact value.
#[inline]
pub fn device_timestamp(device_seconds: u32) -> u64 {
    (device_seconds as u64 * 100 + EPOCH_MS) * 1_000_000
}

#[inline]
fn read_u32_le(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
fn read_i8x3(buf: &[u8], at: usize) -> [i8; 3] {
    [buf[at] as i8, buf[at + 1] as i8, buf[at + 2] as i8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV6};

    fn sensor_addr() -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(
            Ipv6Addr::new(0x2001, 0x470, 0x4956, 0x2, 0x212, 0x6d02, 0, 0x3011),
            4041,
            0,
            0,
        ))
    }

    /// Build an 18-byte packet from field values
    fn packet(seq: u32, accel: [i8; 3], micro: [i8; 3], temp: i32, secs: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MIN_PACKET_LEN);
        buf.extend_from_slice(&seq.to_le_bytes());
        buf.extend(accel.iter().map(|&v| v as u8));
        buf.extend(micro.iter().map(|&v| v as u8));
        buf.extend_from_slice(&temp.to_le_bytes());
        buf.extend_from_slice(&secs.to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_known_fields() {
        let buf = packet(0x0102_0304, [1, -2, 127], [-128, 0, 5], 250_000, 10);
        let decoded = decode(&buf, sensor_addr()).unwrap();

        assert_eq!(decoded.echo_seq, 0x0102_0304);
        let r = decoded.reading;
        assert_eq!(r.serial, 0x3011);
        assert_eq!(r.serial_id, "3011");
        assert_eq!(r.acceleration, [1, -2, 127]);
        assert_eq!(r.micro_acceleration, Some([-128, 0, 5]));
        assert_eq!(r.raw_temperature, Some(250_000));
        assert_eq!(r.temperature_f, Some(77.0));
        assert_eq!(
            r.device_timestamp,
            Some((10 * 100 + EPOCH_MS) * 1_000_000)
        );
    }

    #[test]
    fn test_decode_negative_temperature() {
        // -40 °C == -40 °F
        let buf = packet(1, [0; 3], [0; 3], -400_000, 0);
        let r = decode(&buf, sensor_addr()).unwrap().reading;
        assert_eq!(r.raw_temperature, Some(-400_000));
        assert!((r.temperature_f.unwrap() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_little_endian_multibyte() {
        // Upper bytes must contribute, not just the low byte
        let buf = packet(0xDEAD_BEEF, [0; 3], [0; 3], 0x0012_3456, 0x0100_0000);
        let d = decode(&buf, sensor_addr()).unwrap();
        assert_eq!(d.echo_seq, 0xDEAD_BEEF);
        assert_eq!(d.reading.raw_temperature, Some(0x0012_3456));
        assert_eq!(
            d.reading.device_timestamp,
            Some((0x0100_0000u64 * 100 + EPOCH_MS) * 1_000_000)
        );
    }

    #[test]
    fn test_decode_max_device_seconds_no_overflow() {
        let buf = packet(0, [0; 3], [0; 3], 0, u32::MAX);
        let r = decode(&buf, sensor_addr()).unwrap().reading;
        assert_eq!(
            r.device_timestamp,
            Some((u32::MAX as u64 * 100 + EPOCH_MS) * 1_000_000)
        );
    }

    #[test]
    fn test_decode_rejects_short_payloads() {
        let full = packet(7, [1, 2, 3], [4, 5, 6], 0, 0);
        for len in 0..MIN_PACKET_LEN {
            match decode(&full[..len], sensor_addr()) {
                Err(Error::PacketTooShort { len: got, min }) => {
                    assert_eq!(got, len);
                    assert_eq!(min, MIN_PACKET_LEN);
                }
                other => panic!("len {} should be rejected, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = packet(9, [3, 2, 1], [0; 3], 0, 0);
        let plain = decode(&buf, sensor_addr()).unwrap();
        buf.extend_from_slice(&[0xAA; 16]);
        assert_eq!(decode(&buf, sensor_addr()).unwrap(), plain);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let buf = packet(42, [9, 8, 7], [6, 5, 4], 123_456, 999);
        assert_eq!(
            decode(&buf, sensor_addr()).unwrap(),
            decode(&buf, sensor_addr()).unwrap()
        );
    }

    #[test]
    fn test_serial_zero_padded() {
        let ip = IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x000a));
        assert_eq!(serial_from_addr(ip), 0x000a);
        assert_eq!(format_serial(serial_from_addr(ip)), "000a");
    }

    #[test]
    fn test_serial_ipv4_matches_mapped_form() {
        let v4 = Ipv4Addr::new(10, 0, 0xbe, 0xef);
        let mapped = IpAddr::V6(v4.to_ipv6_mapped());
        assert_eq!(serial_from_addr(IpAddr::V4(v4)), 0xbeef);
        assert_eq!(serial_from_addr(mapped), 0xbeef);
    }
}
