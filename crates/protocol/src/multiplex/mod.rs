//! Multiplex framing over the peer stream.
//!
//! Once activated, one direction of the stream becomes a sequence of
//! frames: a 4-byte little-endian tag whose top byte carries the channel
//! and whose low 24 bits carry the payload length. Channel 0 (tag byte 7)
//! is transfer payload; the other channels carry out-of-band log lines
//! that must be consumed without disturbing payload position.

mod envelope;
mod reader;
mod writer;

pub use envelope::{FrameHeader, MessageCode, HEADER_LEN, MAX_PAYLOAD, MPLEX_BASE};
pub use reader::DemuxReader;
pub use writer::MuxWriter;
