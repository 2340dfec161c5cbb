//! Per-source echo sequence gate
//!
//! Sensors retransmit until they see an ack, so the same packet can arrive
//! several times. Each source address keeps the highest echo sequence
//! admitted so far; anything at or below it is a replay.
//!
//! Entries are never evicted. That is fine for a fixed sensor population,
//! but a deployment with ephemeral source ports or addresses will grow this
//! table without bound.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Highest admitted echo sequence per source
#[derive(Debug, Default)]
pub struct DedupTable {
    last_seen: Mutex<HashMap<SocketAddr, u32>>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `echo_seq` from `source` if it is newer than anything seen.
    ///
    /// Returns `true` and records `echo_seq` when the source is new or its
    /// stored sequence is strictly lower; otherwise leaves the table as is.
    /// The check and update happen under one lock, so concurrent callers
    /// never both win for the same or an older sequence. No wraparound
    /// handling: `0` after `u32::MAX` is a replay.
    pub fn admit(&self, source: SocketAddr, echo_seq: u32) -> bool {
        let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        match last_seen.get_mut(&source) {
            Some(last) if *last >= echo_seq => false,
            Some(last) => {
                *last = echo_seq;
                true
            }
            None => {
                last_seen.insert(source, echo_seq);
                true
            }
        }
    }

    /// Number of sources tracked
    pub fn len(&self) -> usize {
        self.last_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last admitted sequence for `source`
    pub fn last_seen(&self, source: &SocketAddr) -> Option<u32> {
        self.last_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(source)
            .copied()
    }
}
