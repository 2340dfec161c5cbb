//! Consumer side of the reading queue
//!
//! The actual pub/sub transport lives outside this crate. It plugs in through
//! [`Publisher`]; [`run_consumer`] drains the queue into it, one call per
//! reading, logging failures without retrying.

pub mod sink;
pub mod wire;

pub use sink::{FramedPublisher, LogPublisher};
pub use wire::{Serializer, TelemetryRecord, WireFormat};

use crate::error::Result;
use crate::ingest::packet::Reading;
use crate::ingest::queue::ReadingQueue;

/// Downstream transport for decoded readings
pub trait Publisher {
    /// Publish one reading on `topic`
    fn publish(&mut self, topic: &str, reading: &Reading) -> Result<()>;
}

/// Topic for a sensor: `<prefix>/<serial_id>/accel`
pub fn topic_for(prefix: &str, serial_id: &str) -> String {
    format!("{}/{}/accel", prefix, serial_id)
}

/// Consumer loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub failed: u64,
}

/// Drain `queue` into `publisher` until the queue closes (blocking)
pub fn run_consumer(
    queue: &ReadingQueue,
    publisher: &mut dyn Publisher,
    topic_prefix: &str,
) -> PublishStats {
    let mut stats = PublishStats::default();

    for reading in queue.iter() {
        let topic = topic_for(topic_prefix, &reading.serial_id);
        match publisher.publish(&topic, &reading) {
            Ok(()) => {
                stats.published += 1;
                log::debug!("Published ok: {}", topic);
            }
            Err(e) => {
                stats.failed += 1;
                log::warn!("Error publishing {}: {}", topic, e);
            }
        }
    }

    log::info!(
        "Consumer finished ({} published, {} failed)",
        stats.published,
        stats.failed
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ingest::demo::demo_reading;
    use crate::ingest::queue::reading_queue;

    /// Records topics; fails every other call
    struct Flaky {
        topics: Vec<String>,
        calls: usize,
    }

    impl Publisher for Flaky {
        fn publish(&mut self, topic: &str, _reading: &Reading) -> Result<()> {
            self.calls += 1;
            self.topics.push(topic.to_string());
            if self.calls % 2 == 0 {
                Err(Error::Publish("broker unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_topic_format() {
        assert_eq!(topic_for("hamilton", "0a1f"), "hamilton/0a1f/accel");
    }

    #[test]
    fn test_consumer_counts_and_continues_after_failure() {
        let (tx, rx) = reading_queue(8);
        for _ in 0..5 {
            tx.push(demo_reading()).unwrap();
        }
        drop(tx);

        let mut publisher = Flaky {
            topics: Vec::new(),
            calls: 0,
        };
        let stats = run_consumer(&rx, &mut publisher, "hamilton");

        assert_eq!(
            stats,
            PublishStats {
                published: 3,
                failed: 2
            }
        );
        assert!(publisher.topics.iter().all(|t| t == "hamilton/FFFF/accel"));
    }
}
