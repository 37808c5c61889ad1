use std::io;

use protocol::ProtocolError;
use thiserror::Error;

/// Failures in file-list generation, exchange or deletion.
#[derive(Debug, Error)]
pub enum FlistError {
    /// Wire-level failure while exchanging the list.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Local filesystem failure during the deletion pass.
    #[error("deletion pass I/O: {0}")]
    Io(#[from] io::Error),

    /// The peer transmitted a zero-length pathname.
    #[error("security violation: zero-length pathname")]
    EmptyName,

    /// The peer transmitted an absolute pathname.
    #[error("security violation: absolute pathname: {0}")]
    AbsolutePath(String),

    /// The peer transmitted a pathname escaping the transfer root.
    #[error("security violation: backtracking pathname: {0}")]
    Backtracking(String),

    /// A field-reuse flag appeared on the first entry of the list.
    #[error("field reuse without a previous entry")]
    ReuseWithoutPrevious,

    /// The shared-prefix length exceeds the previous pathname.
    #[error("shared name prefix {prefix} exceeds previous name of {len} bytes")]
    BadPrefix {
        /// Prefix length claimed by the peer.
        prefix: usize,
        /// Length of the previously decoded name.
        len: usize,
    },

    /// A symlink entry arrived with an empty target.
    #[error("empty symlink target: {0}")]
    EmptyLinkTarget(String),

    /// Two different source files map onto the same working path.
    #[error("duplicate working path for possibly different file: {0}")]
    DuplicateWorkingPath(String),
}
