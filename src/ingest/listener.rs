//! UDP listener for Hamilton sensor datagrams.
//!
//! Owns the socket. For every datagram it:
//! 1. Sends the 8-byte acknowledgment straight back to the source, before
//!    anything is decoded, so retransmits stop even for packets that are
//!    later rejected.
//! 2. Hands a copy of the payload to the handler pool.
//!
//! # Example
//!
//! ```ignore
//! use hamilton_ingest::ingest::UdpListener;
//!
//! let listener = UdpListener::bind(&config.network, dispatcher, running)?;
//! std::thread::spawn(move || listener.run());
//! ```

use crate::config::NetworkConfig;
use crate::error::Result;
use crate::ingest::ack::AckPacket;
use crate::ingest::handler::{Datagram, Dispatcher};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// Receive buffer size; telemetry packets are 18 bytes
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Receive loop owner
pub struct UdpListener {
    socket: UdpSocket,
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
}

impl UdpListener {
    /// Bind the socket. Failure here is fatal to the daemon.
    pub fn bind(
        config: &NetworkConfig,
        dispatcher: Dispatcher,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind_address)?;

        // Short timeout so the loop can observe shutdown
        socket.set_read_timeout(Some(config.read_timeout()))?;

        log::info!("UDP listener bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            dispatcher,
            running,
        })
    }

    /// Bound address (resolves port 0 to the assigned port)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receive loop (blocking) until `running` clears.
    ///
    /// Dropping `self` on return drops the dispatcher, which lets the
    /// handler pool drain and exit.
    pub fn run(self) {
        log::info!("UDP listener started");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        while self.running.load(Ordering::Relaxed) {
            let (len, src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            let payload = &buffer[..len];
            log::trace!("Got {} byte datagram from {}", len, src);

            // Ack first, independent of decode/dedup outcome
            let ack = AckPacket::new(payload, SystemTime::now());
            if let Err(e) = ack.send_to(&self.socket, src) {
                // Lost acks only cause a retransmit - not fatal
                log::warn!("Failed to ack {}: {}", src, e);
            }

            let datagram = Datagram {
                payload: payload.to_vec(),
                source: src,
            };
            if let Err(e) = self.dispatcher.dispatch(datagram) {
                log::error!("{}; stopping listener", e);
                break;
            }
        }

        log::info!("UDP listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ack::ACK_LEN;
    use crate::ingest::dedup::DedupTable;
    use crate::ingest::handler::{HandlerPool, PacketHandler};
    use crate::ingest::queue::reading_queue;
    use std::thread;
    use std::time::Duration;

    fn loopback_config() -> NetworkConfig {
        NetworkConfig {
            bind_address: "127.0.0.1:0".to_string(),
            read_timeout_ms: 20,
        }
    }

    #[test]
    fn test_bind_failure_is_error() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = NetworkConfig {
            bind_address: taken.local_addr().unwrap().to_string(),
            read_timeout_ms: 20,
        };
        let (tx, _rx) = reading_queue(1);
        let handler = PacketHandler::new(Arc::new(DedupTable::new()), tx);
        let (_pool, dispatcher) = HandlerPool::spawn(1, 1, handler).unwrap();

        let result = UdpListener::bind(&config, dispatcher, Arc::new(AtomicBool::new(true)));
        assert!(result.is_err());
    }

    #[test]
    fn test_acks_short_datagram() {
        let (tx, rx) = reading_queue(4);
        let handler = PacketHandler::new(Arc::new(DedupTable::new()), tx);
        let (pool, dispatcher) = HandlerPool::spawn(1, 4, handler).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let listener =
            UdpListener::bind(&loopback_config(), dispatcher, Arc::clone(&running)).unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || listener.run());

        let sensor = UdpSocket::bind("127.0.0.1:0").unwrap();
        sensor
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        sensor.send_to(&[0xAB, 0xCD, 0x01], addr).unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = sensor.recv_from(&mut buf).unwrap();
        assert_eq!(len, ACK_LEN);
        assert_eq!(&buf[..4], &[0xAB, 0xCD, 0x01, 0x00]);

        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
        pool.join();

        // Rejected by the decoder, nothing queued
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
    }
}
