use std::io;

use engine::EngineError;
use flist::FlistError;
use protocol::ProtocolError;
use thiserror::Error;

/// Fatal failures that terminate a transfer.
///
/// Per-file problems never reach this type; the drivers log and count
/// them and keep the session moving.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Wire-level failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// File-list exchange failure.
    #[error(transparent)]
    Flist(#[from] FlistError),

    /// Delta engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Local filesystem failure outside the per-file loops.
    #[error("local I/O: {0}")]
    Io(#[from] io::Error),

    /// The peer requested a file index outside the exchanged list.
    #[error("file index {index} out of range of {count} entries")]
    BadFileIndex {
        /// Index read off the wire.
        index: i32,
        /// Length of the exchanged list.
        count: usize,
    },

    /// The peer requested a delta for a non-regular file.
    #[error("file index {index} does not name a regular file")]
    NotRegular {
        /// Index read off the wire.
        index: i32,
    },

    /// The end-of-phase acknowledgement was not the expected `-1`.
    #[error("bad end-of-phase acknowledgement: {0}")]
    BadPhaseAck(i32),

    /// A listed source file could not be read when its delta was due.
    ///
    /// By the time the index arrives the receiver is committed to reading
    /// a token stream, so there is no way to skip the file and stay in
    /// sync.
    #[error("{path}: {source}")]
    SourceVanished {
        /// Path of the unreadable source.
        path: String,
        /// Underlying failure.
        source: io::Error,
    },
}

impl TransferError {
    /// Returns `true` when the failure is a protocol fault (as opposed to
    /// local I/O), which maps onto a distinct exit code.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        match self {
            Self::Protocol(err) => err.is_wire_fault(),
            Self::Flist(FlistError::Protocol(err)) => err.is_wire_fault(),
            Self::Flist(FlistError::Io(_)) => false,
            Self::Flist(_) => true,
            Self::Engine(EngineError::Protocol(err)) => err.is_wire_fault(),
            Self::Engine(EngineError::Io(_)) => false,
            Self::Engine(_) => true,
            Self::BadFileIndex { .. } | Self::NotRegular { .. } | Self::BadPhaseAck(_) => true,
            Self::Io(_) | Self::SourceVanished { .. } => false,
        }
    }
}
