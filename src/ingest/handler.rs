//! Per-datagram processing and the worker pool that runs it
//!
//! The listener never decodes anything itself: it hands each datagram to a
//! fixed pool of worker threads through a bounded job channel. Each job is
//! decode → dedup → enqueue. The pool size caps concurrency regardless of
//! how fast packets arrive.
//!
//! ```text
//! ┌──────────┐  Datagram  ┌──────────────┐  Reading  ┌──────────────┐
//! │ Listener │──────────▶│ handler-N ×W │─────────▶│ ReadingQueue │
//! └──────────┘  (bounded) └──────────────┘ (bounded) └──────────────┘
//! ```
//!
//! Workers exit once every [`Dispatcher`] is dropped and the backlog is
//! empty, so in-flight datagrams are always finished on shutdown.

use crate::error::{Error, Result};
use crate::ingest::dedup::DedupTable;
use crate::ingest::packet::decode;
use crate::ingest::queue::ReadingSender;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A received datagram waiting for a worker
#[derive(Debug, Clone)]
pub struct Datagram {
    /// Received bytes, copied out of the listener's buffer
    pub payload: Vec<u8>,
    /// Sender address; keys the dedup table and the serial
    pub source: SocketAddr,
}

/// What happened to one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Decoded, admitted, queued
    Enqueued,
    /// Too short to decode
    Malformed,
    /// Echo sequence not newer than the last admitted from this source
    Duplicate,
    /// Consumer gone; only during shutdown
    QueueClosed,
}

/// Decode-dedup-enqueue for a single datagram
#[derive(Debug, Clone)]
pub struct PacketHandler {
    dedup: Arc<DedupTable>,
    queue: ReadingSender,
}

impl PacketHandler {
    pub fn new(dedup: Arc<DedupTable>, queue: ReadingSender) -> Self {
        Self { dedup, queue }
    }

    /// Process one datagram. Blocks only while the reading queue is full.
    ///
    /// Decoding happens before the dedup check so a malformed packet never
    /// touches the table.
    pub fn handle(&self, payload: &[u8], source: SocketAddr) -> HandleOutcome {
        let decoded = match decode(payload, source) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Dropping datagram from {}: {}", source, e);
                return HandleOutcome::Malformed;
            }
        };

        if !self.dedup.admit(source, decoded.echo_seq) {
            log::trace!(
                "Duplicate echo {} from {} dropped",
                decoded.echo_seq,
                source
            );
            return HandleOutcome::Duplicate;
        }

        let serial_id = decoded.reading.serial_id.clone();
        match self.queue.push(decoded.reading) {
            Ok(()) => {
                log::debug!(
                    "Queued reading from {} (serial {}, echo {})",
                    source,
                    serial_id,
                    decoded.echo_seq
                );
                HandleOutcome::Enqueued
            }
            Err(_) => {
                log::debug!("Reading queue closed, dropping reading from {}", source);
                HandleOutcome::QueueClosed
            }
        }
    }
}

/// Listener-side handle for submitting datagrams to the pool
#[derive(Debug, Clone)]
pub struct Dispatcher {
    jobs: Sender<Datagram>,
}

impl Dispatcher {
    /// Queue a datagram for a worker, waiting if the backlog is full.
    ///
    /// While waiting the listener neither receives nor acks, so a full
    /// backlog is logged. Fails only when every worker has exited.
    pub fn dispatch(&self, datagram: Datagram) -> Result<()> {
        let datagram = match self.jobs.try_send(datagram) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(datagram)) => datagram,
            Err(TrySendError::Disconnected(_)) => return Err(pool_gone()),
        };

        log::warn!(
            "Handler backlog full ({} jobs), listener stalled until a worker frees a slot",
            self.jobs.len()
        );
        self.jobs.send(datagram).map_err(|_| pool_gone())
    }

    /// Jobs waiting for a worker
    pub fn backlog(&self) -> usize {
        self.jobs.len()
    }

    /// True when the next dispatch would wait
    pub fn is_saturated(&self) -> bool {
        self.jobs.is_full()
    }
}

/// Fixed pool of handler threads
pub struct HandlerPool {
    workers: Vec<JoinHandle<()>>,
}

impl HandlerPool {
    /// Spawn `workers` threads sharing one job channel of `backlog` slots
    pub fn spawn(
        workers: usize,
        backlog: usize,
        handler: PacketHandler,
    ) -> Result<(Self, Dispatcher)> {
        let (jobs_tx, jobs_rx) = bounded::<Datagram>(backlog);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = jobs_rx.clone();
            let handler = handler.clone();
            let handle = thread::Builder::new()
                .name(format!("handler-{}", id))
                .spawn(move || worker_loop(rx, handler))
                .map_err(|e| Error::Other(format!("Failed to spawn handler thread: {}", e)))?;
            handles.push(handle);
        }

        log::info!("Handler pool started ({} workers, backlog {})", workers, backlog);

        Ok((Self { workers: handles }, Dispatcher { jobs: jobs_tx }))
    }

    /// Wait for all workers to drain the backlog and exit
    pub fn join(self) {
        for handle in self.workers {
            if let Err(e) = handle.join() {
                log::error!("Handler thread panicked: {:?}", e);
            }
        }
        log::info!("Handler pool stopped");
    }
}

fn pool_gone() -> Error {
    Error::Other("Handler pool has shut down".to_string())
}

fn worker_loop(jobs: Receiver<Datagram>, handler: PacketHandler) {
    // Ends when all dispatchers are dropped and the backlog is empty
    for datagram in jobs.iter() {
        handler.handle(&datagram.payload, datagram.source);
    }
}
