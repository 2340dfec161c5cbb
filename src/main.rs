//! hamilton-ingest - UDP ingestion daemon for Hamilton accelerometer sensors
//!
//! ## Protocol
//!
//! - **UDP (port 4041, IPv6 wildcard)**: 18-byte telemetry datagrams in,
//!   8-byte acknowledgments out to the sender.
//!
//! Decoded readings are published per sensor on `<prefix>/<serial>/accel`.
//!
//! ## Usage
//!
//! ```bash
//! hamilton-ingest                       # /etc/hamilton-ingest.toml or defaults
//! hamilton-ingest ingest.toml           # positional
//! hamilton-ingest --config ingest.toml  # flag
//! RUST_LOG=debug hamilton-ingest        # per-packet logging
//! ```

use hamilton_ingest::config::{Config, SinkKind};
use hamilton_ingest::error::Result;
use hamilton_ingest::ingest::Pipeline;
use hamilton_ingest::publish::{
    FramedPublisher, LogPublisher, Publisher, Serializer, run_consumer,
};
use hamilton_ingest::utils::setup_ctrl_c_handler;
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "/etc/hamilton-ingest.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `hamilton-ingest <path>` (positional)
/// - `hamilton-ingest --config <path>` (flag-based)
/// - `hamilton-ingest -c <path>` (short flag)
///
/// Returns `None` when no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn load_config() -> Result<(Config, String)> {
    match parse_config_path() {
        // An explicit path must exist
        Some(path) => Ok((Config::load(&path)?, path)),
        None => {
            let config = Config::load_or_default(DEFAULT_CONFIG_PATH)?;
            let source = if Path::new(DEFAULT_CONFIG_PATH).exists() {
                DEFAULT_CONFIG_PATH.to_string()
            } else {
                "built-in defaults".to_string()
            };
            Ok((config, source))
        }
    }
}

fn create_publisher(config: &Config) -> Box<dyn Publisher> {
    let serializer = Serializer::new(config.publisher.format);
    match config.publisher.sink {
        SinkKind::Log => Box::new(LogPublisher::new(serializer)),
        SinkKind::Stdout => Box::new(FramedPublisher::new(std::io::stdout(), serializer)),
    }
}

fn main() -> Result<()> {
    let (config, config_source) = load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("hamilton-ingest v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_source);
    log::info!(
        "Queue capacity {}, {} handler workers, publisher {:?}/{:?}",
        config.queue.capacity,
        config.ingest.workers,
        config.publisher.sink,
        config.publisher.format
    );

    let running = setup_ctrl_c_handler()?;

    // Bind failure ends the process here
    let (pipeline, queue) = Pipeline::start(&config, running)?;
    log::info!(
        "Listening on {}. Press Ctrl-C to stop.",
        pipeline.local_addr()
    );

    // Runs until every producer has exited after shutdown
    let mut publisher = create_publisher(&config);
    let stats = run_consumer(&queue, publisher.as_mut(), &config.publisher.topic_prefix);

    log::info!("Shutting down...");
    pipeline.join();

    log::info!(
        "hamilton-ingest stopped ({} published, {} failed)",
        stats.published,
        stats.failed
    );
    Ok(())
}
