//! hamilton-ingest - UDP ingestion gateway for Hamilton accelerometer sensors
//!
//! Receives fixed-format telemetry datagrams, acknowledges each one,
//! drops retransmissions, decodes the payload, and queues the readings for
//! a publisher. A demo generator feeds synthetic readings into the same
//! queue.
//!
//! ## Modules
//!
//! - [`ingest`]: socket, decoder, dedup table, handler pool, reading queue
//! - [`publish`]: publisher seam, record wire formats, consumer loop
//! - [`config`]: TOML configuration
//! - [`utils`]: signal handling

pub mod config;
pub mod error;
pub mod ingest;
pub mod publish;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{Pipeline, Reading, ReadingQueue};
pub use publish::{Publisher, run_consumer};
