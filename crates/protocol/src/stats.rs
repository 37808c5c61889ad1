use crate::codec::{WireRead, WireWrite};
use crate::error::ProtocolError;

/// End-of-transfer accounting exchanged after the final phase.
///
/// Three longs on the wire, in this order: bytes the sender read, bytes
/// the sender wrote, and the total size of all listed files. The sender
/// reports its own perspective; the receiver prints both sides.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionStats {
    /// Wire bytes read, multiplex framing included.
    pub bytes_read: u64,
    /// Wire bytes written, multiplex framing included.
    pub bytes_written: u64,
    /// Sum of the sizes of every file in the exchanged list.
    pub total_size: u64,
}

impl SessionStats {
    /// Writes the three accounting longs.
    pub fn send<W: WireWrite>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        writer.write_long(self.bytes_read as i64)?;
        writer.write_long(self.bytes_written as i64)?;
        writer.write_long(self.total_size as i64)?;
        Ok(())
    }

    /// Reads the three accounting longs.
    pub fn recv<R: WireRead>(reader: &mut R) -> Result<Self, ProtocolError> {
        let bytes_read = reader.read_long()?;
        let bytes_written = reader.read_long()?;
        let total_size = reader.read_long()?;
        Ok(Self {
            bytes_read: bytes_read.max(0) as u64,
            bytes_written: bytes_written.max(0) as u64,
            total_size: total_size.max(0) as u64,
        })
    }
}
