//! Publisher implementations shipped with the daemon

use crate::error::{Error, Result};
use crate::ingest::packet::Reading;
use crate::publish::Publisher;
use crate::publish::wire::Serializer;
use std::io::Write;

/// Logs every record; the default when no bridge is attached
pub struct LogPublisher {
    serializer: Serializer,
}

impl LogPublisher {
    pub fn new(serializer: Serializer) -> Self {
        Self { serializer }
    }
}

impl Publisher for LogPublisher {
    fn publish(&mut self, topic: &str, reading: &Reading) -> Result<()> {
        let payload = self.serializer.serialize(reading)?;
        log::info!(
            "Published {} ({} bytes, {:?})",
            topic,
            payload.len(),
            self.serializer.format()
        );
        Ok(())
    }
}

/// Writes length-prefixed frames to any writer
///
/// Each record is two frames, topic then payload:
///
/// ```text
/// ┌────────────┬───────────┬────────────┬──────────────┐
/// │ Len (u32)  │ Topic     │ Len (u32)  │ Record       │
/// │ big-endian │ UTF-8     │ big-endian │ JSON/postcard│
/// └────────────┴───────────┴────────────┴──────────────┘
/// ```
pub struct FramedPublisher<W: Write> {
    writer: W,
    serializer: Serializer,
    buffer: Vec<u8>,
}

impl<W: Write> FramedPublisher<W> {
    pub fn new(writer: W, serializer: Serializer) -> Self {
        Self {
            writer,
            serializer,
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn push_frame(buffer: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| Error::Publish(format!("frame too large: {} bytes", bytes.len())))?;
        buffer.extend_from_slice(&len.to_be_bytes());
        buffer.extend_from_slice(bytes);
        Ok(())
    }
}

impl<W: Write> Publisher for FramedPublisher<W> {
    fn publish(&mut self, topic: &str, reading: &Reading) -> Result<()> {
        let payload = self.serializer.serialize(reading)?;

        // One write per record so a reader never sees half a pair
        self.buffer.clear();
        Self::push_frame(&mut self.buffer, topic.as_bytes())?;
        Self::push_frame(&mut self.buffer, &payload)?;

        self.writer
            .write_all(&self.buffer)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::Publish(format!("{}: {}", topic, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::demo::demo_reading;
    use crate::publish::wire::WireFormat;
    use std::io;

    fn read_frame(bytes: &[u8]) -> (&[u8], &[u8]) {
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        (&bytes[4..4 + len], &bytes[4 + len..])
    }

    #[test]
    fn test_framed_layout() {
        let serializer = Serializer::new(WireFormat::Json);
        let mut publisher = FramedPublisher::new(Vec::new(), serializer.clone());
        publisher
            .publish("hamilton/FFFF/accel", &demo_reading())
            .unwrap();

        let out = publisher.into_inner();
        let (topic, rest) = read_frame(&out);
        let (payload, rest) = read_frame(rest);

        assert_eq!(topic, b"hamilton/FFFF/accel");
        assert!(rest.is_empty());
        let record = serializer.deserialize(payload).unwrap();
        assert_eq!(record.serial, 0xFFFF);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_publish_error() {
        let mut publisher = FramedPublisher::new(BrokenPipe, Serializer::new(WireFormat::Json));
        let err = publisher.publish("t", &demo_reading()).unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
    }

    #[test]
    fn test_log_publisher_accepts_reading() {
        let mut publisher = LogPublisher::new(Serializer::new(WireFormat::Postcard));
        assert!(publisher.publish("hamilton/FFFF/accel", &demo_reading()).is_ok());
    }
}
