//! Record serialization for published readings
//!
//! A reading is published as a small map keyed the way Hamilton consumers
//! expect:
//!
//! | Key  | Field                     |
//! |------|---------------------------|
//! | `#`  | numeric serial            |
//! | `A`  | acceleration [x, y, z]    |
//! | `MA` | micro-acceleration        |
//! | `T`  | raw temperature (1e-4 °C) |
//! | `F`  | temperature (°F)          |
//! | `W`  | device timestamp          |
//!
//! ## Wire Formats
//!
//! ### JSON (Default)
//! Absent fields (demo readings) are omitted from the object.
//!
//! ### MessagePack (Binary)
//! The same map as JSON, keys included, in MessagePack. This is what
//! Hamilton telemetry consumers decode.
//!
//! ### Postcard (Binary)
//! Compact and schema-bound; absent fields are encoded as `None` so the
//! layout stays fixed.

use crate::error::Result;
use crate::ingest::packet::Reading;
use serde::{Deserialize, Serialize};

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Binary format using postcard - fast and compact
    Postcard,
    /// JSON format - human-readable for debugging
    #[default]
    Json,
    /// MessagePack map keyed like JSON
    #[serde(rename = "msgpack")]
    MsgPack,
}

/// Published form of a [`Reading`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(rename = "#")]
    pub serial: u16,
    #[serde(rename = "A")]
    pub acceleration: [i8; 3],
    #[serde(rename = "MA", default)]
    pub micro_acceleration: Option<[i8; 3]>,
    #[serde(rename = "T", default)]
    pub raw_temperature: Option<i32>,
    #[serde(rename = "F", default)]
    pub temperature_f: Option<f64>,
    #[serde(rename = "W", default)]
    pub device_timestamp: Option<u64>,
}

impl From<&Reading> for TelemetryRecord {
    fn from(r: &Reading) -> Self {
        Self {
            serial: r.serial,
            acceleration: r.acceleration,
            micro_acceleration: r.micro_acceleration,
            raw_temperature: r.raw_temperature,
            temperature_f: r.temperature_f,
            device_timestamp: r.device_timestamp,
        }
    }
}

/// Serializer for the configured format
#[derive(Debug, Clone)]
pub struct Serializer {
    format: WireFormat,
}

impl Serializer {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encode a reading as a record
    pub fn serialize(&self, reading: &Reading) -> Result<Vec<u8>> {
        let record = TelemetryRecord::from(reading);
        match self.format {
            WireFormat::Postcard => Ok(postcard::to_allocvec(&record)?),
            WireFormat::Json => Ok(serde_json::to_vec(&present_fields(&record)?)?),
            WireFormat::MsgPack => Ok(rmp_serde::to_vec(&present_fields(&record)?)?),
        }
    }

    /// Decode a record produced by [`serialize`](Self::serialize)
    pub fn deserialize(&self, bytes: &[u8]) -> Result<TelemetryRecord> {
        match self.format {
            WireFormat::Postcard => Ok(postcard::from_bytes(bytes)?),
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
            WireFormat::MsgPack => Ok(rmp_serde::from_slice(bytes)?),
        }
    }
}

/// Record as a map without the absent fields
fn present_fields(record: &TelemetryRecord) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    Ok(value)
}
