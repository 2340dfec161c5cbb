//! Acknowledgment packets
//!
//! Every received datagram is answered with 8 bytes:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ Echo (4 bytes)       │ Coarse timestamp         │
//! │ inbound bytes [0..4) │ u32 LE, 0.1 s since 2016 │
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! The echo is copied verbatim, so the sensor can match the ack even when
//! the packet was later rejected. The timestamp lets sensors sync their
//! clock to the gateway.

use crate::ingest::packet::EPOCH_MS;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{SystemTime, UNIX_EPOCH};

/// Acknowledgment size on the wire
pub const ACK_LEN: usize = 8;

/// Coarse timestamp: 0.1 s ticks since [`EPOCH_MS`], truncated to 32 bits.
///
/// Clocks set before the epoch yield 0.
pub fn coarse_timestamp(now: SystemTime) -> u32 {
    let now_ms = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    (now_ms.saturating_sub(EPOCH_MS) / 100) as u32
}

/// A ready-to-send acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    data: [u8; ACK_LEN],
}

impl AckPacket {
    /// Build an ack for `datagram` stamped with `now`.
    ///
    /// Datagrams shorter than 4 bytes echo what they have, zero-padded.
    pub fn new(datagram: &[u8], now: SystemTime) -> Self {
        let mut data = [0u8; ACK_LEN];
        let echo_len = datagram.len().min(4);
        data[..echo_len].copy_from_slice(&datagram[..echo_len]);
        data[4..].copy_from_slice(&coarse_timestamp(now).to_le_bytes());
        Self { data }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Echoed bytes
    #[inline]
    pub fn echo(&self) -> [u8; 4] {
        [self.data[0], self.data[1], self.data[2], self.data[3]]
    }

    #[inline]
    pub fn timestamp(&self) -> u32 {
        u32::from_le_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }

    /// Send to `target`. Fire-and-forget: callers log failures and move on.
    pub fn send_to(&self, socket: &UdpSocket, target: SocketAddr) -> io::Result<()> {
        socket.send_to(&self.data, target)?;
        Ok(())
    }
}
