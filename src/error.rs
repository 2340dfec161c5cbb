//! Error types for hamilton-ingest

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// hamilton-ingest error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (socket bind, send, config file read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Datagram shorter than the fixed telemetry layout
    #[error("Packet too short: {len} bytes, need at least {min}")]
    PacketTooShort {
        /// Received length
        len: usize,
        /// Minimum layout size
        min: usize,
    },

    /// Record serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publisher rejected a record
    #[error("Publish error: {0}")]
    Publish(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
