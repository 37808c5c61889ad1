//! Byte-counting stream wrappers and descriptor readiness polling.
//!
//! The role drivers wrap each half of the peer stream in a counter so the
//! end-of-transfer statistics report true wire bytes, multiplex headers
//! included. `poll_readable` backs the receiver's opportunistic drain of
//! queued log frames before it blocks on its next write.

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

/// [`Read`] adapter that tallies every byte pulled from the inner stream.
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    bytes: u64,
}

impl<R> CountingReader<R> {
    /// Wraps `inner` with a zeroed counter.
    pub fn new(inner: R) -> Self {
        Self { inner, bytes: 0 }
    }

    /// Total bytes read so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.bytes
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }
}

impl<R: AsRawFd> AsRawFd for CountingReader<R> {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

/// [`Write`] adapter that tallies every byte pushed to the inner stream.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W> CountingWriter<W> {
    /// Wraps `inner` with a zeroed counter.
    pub fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    /// Total bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reports whether `fd` has bytes queued for reading, without blocking.
pub(crate) fn poll_readable(fd: RawFd) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: pfd is a valid, initialised pollfd for the duration of the call.
    let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0 && (pfd.revents & libc::POLLIN) != 0)
}
