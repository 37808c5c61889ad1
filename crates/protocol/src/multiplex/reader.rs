use std::io::{self, Read};
use std::os::fd::AsRawFd;

use logging::{Logger, Message};

use super::envelope::{FrameHeader, MessageCode, HEADER_LEN};
use crate::io::poll_readable;

/// Demultiplexing [`Read`] adapter.
///
/// Until [`activate`](Self::activate) is called the adapter is transparent,
/// which covers the pre-handshake portion of the stream. Afterwards it
/// tracks how many bytes remain in the current payload frame and refills
/// from the next frame tag when that reaches zero. Log-channel frames are
/// consumed in place and routed to the session logger, so callers only
/// ever observe payload bytes.
#[derive(Debug)]
pub struct DemuxReader<R> {
    inner: R,
    remain: usize,
    active: bool,
    logger: Logger,
}

enum Frame {
    Payload(usize),
    Log,
    Eof,
}

impl<R: Read> DemuxReader<R> {
    /// Wraps `inner` in transparent (inactive) mode.
    pub fn new(inner: R, logger: Logger) -> Self {
        Self {
            inner,
            remain: 0,
            active: false,
            logger,
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
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Reads one frame tag; dispatches a log frame, or records the payload
    /// length for subsequent `read` calls. A clean close exactly on a frame
    /// boundary reads as end-of-stream rather than an error.
    fn next_frame(&mut self) -> io::Result<Frame> {
        let mut tag = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.inner.read(&mut tag[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(Frame::Eof);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame tag",
                ));
            }
            filled += n;
        }
        let header = FrameHeader::decode(tag)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        if header.code() == MessageCode::Data {
            self.remain = header.len();
            return Ok(Frame::Payload(header.len()));
        }

        let mut payload = vec![0u8; header.len()];
        self.inner.read_exact(&mut payload)?;
        self.dispatch_log(header.code(), &payload);
        Ok(Frame::Log)
    }

    fn dispatch_log(&self, code: MessageCode, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        for line in text.lines().filter(|line| !line.is_empty()) {
            self.logger
                .write(&Message::new(code.severity(), format!("(remote) {line}")));
        }
    }
}

impl<R: Read> Read for DemuxReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.active {
            return self.inner.read(buf);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        while self.remain == 0 {
            if let Frame::Eof = self.next_frame()? {
                return Ok(0);
            }
        }
        let want = buf.len().min(self.remain);
        let got = self.inner.read(&mut buf[..want])?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a payload frame",
            ));
        }
        self.remain -= got;
        Ok(got)
    }
}

impl<R: Read + AsRawFd> DemuxReader<R> {
    /// Opportunistically consumes log frames already queued on the
    /// descriptor, without blocking for more.
    ///
    /// Stops as soon as a payload frame tag is seen (its length is kept for
    /// the next `read`) or the descriptor has nothing ready. Called by the
    /// receiver before it blocks on a write, so peer diagnostics surface
    /// promptly instead of piling up in the socket buffer.
    pub fn drain_pending(&mut self) -> io::Result<()> {
        while self.active && self.remain == 0 && poll_readable(self.inner.as_raw_fd())? {
            match self.next_frame()? {
                Frame::Payload(_) | Frame::Eof => break,
                Frame::Log => {}
            }
        }
        Ok(())
    }
}
