use std::io;

use protocol::ProtocolError;
use thiserror::Error;

/// Fatal failures inside the delta engine.
///
/// Per-file problems (a digest mismatch, a stray block reference) are not
/// errors at this level; they surface as a [`crate::MergeOutcome`] so the
/// transfer can move on to the next file with the wire still in sync.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wire-level failure while exchanging block sets or tokens.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Local I/O failure outside the merge loop.
    #[error("delta I/O: {0}")]
    Io(#[from] io::Error),

    /// The peer sent a block-set header that cannot describe a file.
    #[error("invalid block set: {0} blocks of {1} bytes, {2} trailing")]
    BadBlockHeader(usize, usize, usize),

    /// The peer sent a strong-digest length outside the 2..=16 range.
    #[error("invalid strong-digest length {0}")]
    BadDigestLength(usize),
}
