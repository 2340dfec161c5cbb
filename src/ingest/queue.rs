//! Bounded reading queue between producers and the publisher
//!
//! Packet handlers and the demo generator push; a single consumer pulls.
//! When full, `push` blocks until the consumer makes room, so readings are
//! never dropped for lack of space. This is the only flow control in the
//! pipeline and it applies equally to live and synthetic readings.
//!
//! The queue closes once every [`ReadingSender`] is dropped; the consumer
//! then drains what is left and sees `None`.

use crate::ingest::packet::Reading;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::time::Duration;

pub use crossbeam_channel::RecvTimeoutError;

/// Create a queue with fixed `capacity`
pub fn reading_queue(capacity: usize) -> (ReadingSender, ReadingQueue) {
    let (tx, rx) = bounded(capacity);
    (ReadingSender { tx }, ReadingQueue { rx, capacity })
}

/// Producer handle; clone one per producer
#[derive(Debug, Clone)]
pub struct ReadingSender {
    tx: Sender<Reading>,
}

impl ReadingSender {
    /// Push a reading, blocking while the queue is full.
    ///
    /// Hands the reading back if the consumer is gone.
    pub fn push(&self, reading: Reading) -> Result<(), Reading> {
        self.tx.send(reading).map_err(|e| e.into_inner())
    }
}

/// Consumer side
#[derive(Debug)]
pub struct ReadingQueue {
    rx: Receiver<Reading>,
    capacity: usize,
}

impl ReadingQueue {
    /// Next reading in queue order; `None` once closed and drained
    pub fn recv(&self) -> Option<Reading> {
        self.rx.recv().ok()
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    ///
    /// `Timeout` means the queue is idle; `Disconnected` means it is closed
    /// and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Reading, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Blocking iterator that ends when the queue closes
    pub fn iter(&self) -> impl Iterator<Item = Reading> + '_ {
        self.rx.iter()
    }

    /// Readings currently waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
