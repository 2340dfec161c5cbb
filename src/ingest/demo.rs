//! Synthetic reading generator
//!
//! Pushes a fixed reading onto the queue on every tick, independent of
//! network traffic. Lets a deployment be checked end to end before any
//! sensor is on the mesh.

use crate::ingest::packet::{DEMO_SERIAL, Reading};
use crate::ingest::queue::ReadingSender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, so shutdown is noticed promptly
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// The demo reading: serial `FFFF`, acceleration (10, 20, 30), nothing else
pub fn demo_reading() -> Reading {
    Reading {
        serial: DEMO_SERIAL,
        serial_id: "FFFF".to_string(),
        acceleration: [10, 20, 30],
        micro_acceleration: None,
        raw_temperature: None,
        temperature_f: None,
        device_timestamp: None,
    }
}

/// Periodic demo producer
pub struct DemoGenerator {
    interval: Duration,
    queue: ReadingSender,
    running: Arc<AtomicBool>,
}

impl DemoGenerator {
    pub fn new(interval: Duration, queue: ReadingSender, running: Arc<AtomicBool>) -> Self {
        Self {
            interval,
            queue,
            running,
        }
    }

    /// Run until `running` clears or the queue closes (blocking).
    ///
    /// The first reading goes out one interval after start. Each later tick
    /// is one interval after the previous push returned, so time spent
    /// blocked on a full queue is never made up with a burst. Returns the
    /// number of readings pushed.
    pub fn run(self) -> u64 {
        log::info!("Demo generator started (every {:?})", self.interval);

        let mut sent = 0u64;
        let mut next_tick = Instant::now() + self.interval;

        while self.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_tick {
                std::thread::sleep((next_tick - now).min(SHUTDOWN_POLL));
                continue;
            }
            // Blocks while the queue is full, same as live readings
            if self.queue.push(demo_reading()).is_err() {
                log::debug!("Reading queue closed, demo generator exiting");
                break;
            }
            next_tick = Instant::now() + self.interval;
            sent += 1;
            log::trace!("Demo reading #{} queued", sent);
        }

        log::info!("Demo generator stopped ({} readings)", sent);
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::queue::reading_queue;
    use std::thread;

    #[test]
    fn test_demo_reading_fields() {
        let r = demo_reading();
        assert_eq!(r.serial_id, "FFFF");
        assert_eq!(r.serial, 0xFFFF);
        assert_eq!(r.acceleration, [10, 20, 30]);
        assert!(r.micro_acceleration.is_none());
        assert!(r.raw_temperature.is_none());
        assert!(r.temperature_f.is_none());
        assert!(r.device_timestamp.is_none());
    }

    #[test]
    fn test_generator_emits_on_each_tick() {
        let (tx, rx) = reading_queue(16);
        let running = Arc::new(AtomicBool::new(true));
        let generator = DemoGenerator::new(Duration::from_millis(20), tx, Arc::clone(&running));
        let handle = thread::spawn(move || generator.run());

        for _ in 0..3 {
            let r = rx
                .recv_timeout(Duration::from_secs(2))
                .expect("demo reading");
            assert_eq!(r, demo_reading());
        }

        running.store(false, Ordering::Relaxed);
        let sent = handle.join().unwrap();
        assert!(sent >= 3);
    }

    #[test]
    fn test_no_burst_after_stalled_consumer() {
        let interval = Duration::from_millis(50);
        let (tx, rx) = reading_queue(1);
        let running = Arc::new(AtomicBool::new(true));
        let generator = DemoGenerator::new(interval, tx, Arc::clone(&running));
        let handle = thread::spawn(move || generator.run());

        // Queue fills after one tick, then the generator blocks on push
        thread::sleep(Duration::from_millis(600));

        let window = Duration::from_millis(120);
        let start = Instant::now();
        let mut got = 0;
        while start.elapsed() < window {
            if rx.recv_timeout(Duration::from_millis(5)).is_ok() {
                got += 1;
            }
        }

        // Queued + blocked reading, then at most one per interval
        assert!(got <= 5, "{} readings in {:?} after stall", got, window);

        running.store(false, Ordering::Relaxed);
        drop(rx);
        handle.join().unwrap();
    }

    #[test]
    fn test_generator_stops_when_queue_closed() {
        let (tx, rx) = reading_queue(1);
        drop(rx);
        let running = Arc::new(AtomicBool::new(true));
        let generator = DemoGenerator::new(Duration::from_millis(5), tx, running);
        assert_eq!(generator.run(), 0);
    }

    #[test]
    fn test_generator_stops_on_shutdown() {
        let (tx, _rx) = reading_queue(1);
        let running = Arc::new(AtomicBool::new(true));
        let generator = DemoGenerator::new(Duration::from_secs(3600), tx, Arc::clone(&running));
        let handle = thread::spawn(move || generator.run());

        running.store(false, Ordering::Relaxed);
        assert_eq!(handle.join().unwrap(), 0);
    }
}
