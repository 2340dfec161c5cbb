//! Wiring for the ingestion threads
//!
//! ```text
//!  sensors ──UDP──▶ listener ──▶ handler pool ──┐
//!                      │                        ├──▶ ReadingQueue ──▶ consumer
//!                      └──ack──▶ sensors        │
//!                          demo generator ──────┘
//! ```
//!
//! [`Pipeline::start`] returns the consumer end of the queue. The pipeline
//! keeps no sender of its own, so the queue closes exactly when the last
//! producer thread exits after shutdown.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::dedup::DedupTable;
use crate::ingest::demo::DemoGenerator;
use crate::ingest::handler::{HandlerPool, PacketHandler};
use crate::ingest::listener::UdpListener;
use crate::ingest::queue::{ReadingQueue, reading_queue};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Running ingestion threads
pub struct Pipeline {
    listener: JoinHandle<()>,
    pool: HandlerPool,
    demo: Option<JoinHandle<u64>>,
    local_addr: SocketAddr,
    dedup: Arc<DedupTable>,
}

impl Pipeline {
    /// Bind the socket and spawn listener, handler pool and demo generator.
    ///
    /// On any failure, threads already started are stopped and joined before
    /// the error is returned.
    pub fn start(config: &Config, running: Arc<AtomicBool>) -> Result<(Self, ReadingQueue)> {
        let (reading_tx, reading_rx) = reading_queue(config.queue.capacity);
        let dedup = Arc::new(DedupTable::new());

        let handler = PacketHandler::new(Arc::clone(&dedup), reading_tx.clone());
        let (pool, dispatcher) =
            HandlerPool::spawn(config.ingest.workers, config.ingest.job_backlog, handler)?;

        // On bind failure the dispatcher is dropped here and the pool exits
        let listener = match UdpListener::bind(&config.network, dispatcher, Arc::clone(&running)) {
            Ok(l) => l,
            Err(e) => {
                pool.join();
                return Err(e);
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                drop(listener);
                pool.join();
                return Err(e);
            }
        };

        let spawned = thread::Builder::new()
            .name("udp-listener".to_string())
            .spawn(move || listener.run());
        let listener = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // The closure and its dispatcher are gone, so workers exit
                pool.join();
                return Err(Error::Other(format!("Failed to spawn UDP listener: {}", e)));
            }
        };

        let demo = if config.demo.enabled {
            let generator =
                DemoGenerator::new(config.demo.interval(), reading_tx, Arc::clone(&running));
            let spawned = thread::Builder::new()
                .name("demo-generator".to_string())
                .spawn(move || generator.run());
            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    // No consumer will drain the queue; unblock pushing workers
                    drop(reading_rx);
                    stop_started(&running, listener, pool);
                    return Err(Error::Other(format!(
                        "Failed to spawn demo generator: {}",
                        e
                    )));
                }
            }
        } else {
            log::info!("Demo generator disabled");
            drop(reading_tx);
            None
        };

        Ok((
            Self {
                listener,
                pool,
                demo,
                local_addr,
                dedup,
            },
            reading_rx,
        ))
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of distinct sources seen so far
    pub fn source_count(&self) -> usize {
        self.dedup.len()
    }

    /// Wait for every thread after the running flag has been cleared.
    ///
    /// The queue consumer must keep draining until this returns, or handlers
    /// blocked on a full queue never finish.
    pub fn join(self) {
        if let Err(e) = self.listener.join() {
            log::error!("UDP listener panicked: {:?}", e);
        }
        self.pool.join();
        if let Some(demo) = self.demo {
            match demo.join() {
                Ok(sent) => log::debug!("Demo generator produced {} readings", sent),
                Err(e) => log::error!("Demo generator panicked: {:?}", e),
            }
        }
        log::info!("Pipeline stopped ({} sources seen)", self.dedup.len());
    }
}

/// Tear down threads already running when a later start step fails
fn stop_started(running: &AtomicBool, listener: JoinHandle<()>, pool: HandlerPool) {
    running.store(false, Ordering::Relaxed);
    if let Err(e) = listener.join() {
        log::error!("UDP listener panicked: {:?}", e);
    }
    pool.join();
}
