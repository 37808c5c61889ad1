use std::io;

use thiserror::Error;

/// Failures raised by the wire layer.
///
/// `Io` wraps local descriptor failures; every other variant describes a
/// malformed or unexpected byte stream and is fatal to the session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream mid-message.
    #[error("unexpected end of stream from peer")]
    UnexpectedEof,

    /// Descriptor-level read or write failure.
    #[error("peer stream I/O: {0}")]
    Io(#[from] io::Error),

    /// A length field decoded to a negative value.
    #[error("negative length on the wire: {0}")]
    NegativeSize(i64),

    /// A newline-terminated line exceeded the sanity bound.
    #[error("line from peer exceeds {0} bytes")]
    LineTooLong(usize),

    /// The peer announced a protocol version this implementation cannot
    /// speak.
    #[error("remote protocol version {remote} is older than {local}")]
    VersionTooOld {
        /// Version announced by the peer.
        remote: i32,
        /// Version spoken locally.
        local: i32,
    },

    /// A multiplex frame tag carried an unknown channel byte.
    #[error("invalid multiplex tag {tag:#010x}")]
    BadTag {
        /// The raw 32-bit tag as read from the stream.
        tag: u32,
    },
}

impl ProtocolError {
    /// Maps `read_exact`-style EOF errors onto [`ProtocolError::UnexpectedEof`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err)
        }
    }

    /// Returns `true` when the failure indicates a malformed or truncated
    /// byte stream rather than a local descriptor problem.
    #[must_use]
    pub fn is_wire_fault(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_unexpected_eof() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            ProtocolError::from_read(err),
            ProtocolError::UnexpectedEof
        ));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(
            ProtocolError::from_read(err),
            ProtocolError::Io(_)
        ));
    }

    #[test]
    fn wire_fault_classification() {
        assert!(ProtocolError::UnexpectedEof.is_wire_fault());
        assert!(ProtocolError::NegativeSize(-1).is_wire_fault());
        assert!(
            !ProtocolError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "perm"))
                .is_wire_fault()
        );
    }
}
