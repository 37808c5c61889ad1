use std::io::{self, Write};

use super::envelope::{FrameHeader, MessageCode, MAX_PAYLOAD};

/// Multiplexing [`Write`] adapter.
///
/// Transparent until [`activate`](Self::activate); afterwards every write
/// is wrapped in a payload frame. Frame boundaries carry no meaning to the
/// receiver, so a logical message may be split across frames however the
/// caller's write pattern falls out.
#[derive(Debug)]
pub struct MuxWriter<W> {
    inner: W,
    active: bool,
}

impl<W: Write> MuxWriter<W> {
    /// Wraps `inner` in transparent (inactive) mode.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            active: false,
        }
    }

    /// Switches the stream into framed mode. Irreversible for the session.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Returns `true` once framed mode is on.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Borrows the wrapped stream.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Sends an out-of-band log line to the peer.
    ///
    /// Only meaningful in framed mode; before activation there is no side
    /// channel and the line is dropped (the caller's own logger has already
    /// seen it).
    pub fn send_message(&mut self, code: MessageCode, text: &str) -> io::Result<()> {
        debug_assert!(code != MessageCode::Data);
        if !self.active {
            return Ok(());
        }
        let mut line = text.as_bytes().to_vec();
        line.push(b'\n');
        let len = line.len().min(MAX_PAYLOAD);
        self.inner
            .write_all(&FrameHeader::new(code, len).encode())?;
        self.inner.write_all(&line[..len])
    }
}

impl<W: Write> Write for MuxWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.active {
            return self.inner.write(buf);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min(MAX_PAYLOAD);
        self.inner
            .write_all(&FrameHeader::new(MessageCode::Data, len).encode())?;
        self.inner.write_all(&buf[..len])?;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
