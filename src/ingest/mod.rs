//! Datagram ingestion: decode, dedup, ack, and hand-off to the reading queue

pub mod ack;
pub mod dedup;
pub mod demo;
pub mod handler;
pub mod listener;
pub mod packet;
pub mod pipeline;
pub mod queue;

pub use ack::AckPacket;
pub use dedup::DedupTable;
pub use demo::{DemoGenerator, demo_reading};
pub use handler::{Datagram, Dispatcher, HandleOutcome, HandlerPool, PacketHandler};
pub use listener::UdpListener;
pub use packet::{DecodedPacket, EPOCH_MS, MIN_PACKET_LEN, Reading, decode};
pub use pipeline::Pipeline;
pub use queue::{ReadingQueue, ReadingSender, RecvTimeoutError, reading_queue};
