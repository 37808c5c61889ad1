use std::io::{self, Write};

use checksums::{FileDigest, STRONG_LEN};
use logging::Logger;
use protocol::{WireRead, MAX_CHUNK};

use crate::blocks::BlockSet;
use crate::error::EngineError;

/// Byte accounting for one merged file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    /// Bytes copied from the wire.
    pub literal: u64,
    /// Bytes copied from the basis file.
    pub matched: u64,
}

/// How one file's merge ended.
///
/// Only [`Verified`](Self::Verified) leaves a usable reconstruction; the
/// other outcomes are per-file failures that the receiver reports and
/// counts while moving on to the next file. In every case the token
/// stream has been consumed through the trailing digest, so the wire
/// stays in sync.
#[derive(Debug)]
pub enum MergeOutcome {
    /// Reconstruction complete and the digests agree. Carries the agreed
    /// whole-file digest so callers can compare it against other content
    /// (the receiver uses it to spot files identical to their basis).
    Verified {
        /// Byte accounting for the merge.
        stats: MergeStats,
        /// The verified whole-file digest.
        digest: [u8; STRONG_LEN],
    },
    /// The reconstruction's digest differs from the sender's.
    DigestMismatch,
    /// A match token referenced a block outside the set.
    BadBlockIndex(i64),
    /// The basis or the output failed locally mid-merge.
    Io(io::Error),
}

impl MergeOutcome {
    /// Returns `true` for a verified reconstruction.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Consumes one file's token stream, writing the reconstruction to `out`.
///
/// Literal tokens copy bytes from the wire; match tokens copy the
/// referenced block's range out of `basis`. Every byte written also feeds
/// the running whole-file digest, which is checked against the 16 bytes
/// following the zero token. After a per-file failure the remaining
/// tokens are still drained (literal payloads skipped, matches ignored)
/// so the session can continue.
pub fn apply_delta<R, W>(
    reader: &mut R,
    basis: &[u8],
    set: &BlockSet,
    seed: i32,
    out: &mut W,
    logger: &Logger,
) -> Result<MergeOutcome, EngineError>
where
    R: WireRead,
    W: Write,
{
    let mut digest = FileDigest::new(seed);
    let mut stats = MergeStats::default();
    let mut failure: Option<MergeOutcome> = None;
    let mut buf = vec![0u8; MAX_CHUNK];

    loop {
        let token = reader.read_int()?;
        if token == 0 {
            break;
        }

        if token > 0 {
            let mut left = token as usize;
            while left > 0 {
                let n = left.min(MAX_CHUNK);
                reader.read_buf(&mut buf[..n])?;
                if failure.is_none() {
                    digest.update(&buf[..n]);
                    if let Err(err) = out.write_all(&buf[..n]) {
                        logger.error(format!("writing reconstruction: {err}"));
                        failure = Some(MergeOutcome::Io(err));
                    }
                }
                left -= n;
            }
            stats.literal += token as u64;
            continue;
        }

        let index = -i64::from(token) - 1;
        if failure.is_some() {
            continue;
        }
        let range = usize::try_from(index)
            .ok()
            .and_then(|idx| set.blocks.get(idx))
            .and_then(|block| {
                let start = block.offs as usize;
                basis.get(start..start + block.len)
            });
        match range {
            Some(bytes) => {
                digest.update(bytes);
                stats.matched += bytes.len() as u64;
                if let Err(err) = out.write_all(bytes) {
                    logger.error(format!("writing reconstruction: {err}"));
                    failure = Some(MergeOutcome::Io(err));
                }
            }
            None => {
                logger.error(format!(
                    "delta references block {index} of {}",
                    set.count()
                ));
                failure = Some(MergeOutcome::BadBlockIndex(index));
            }
        }
    }

    let mut wire_digest = [0u8; STRONG_LEN];
    reader.read_buf(&mut wire_digest)?;

    if let Some(outcome) = failure {
        return Ok(outcome);
    }
    if digest.finalize() != wire_digest {
        return Ok(MergeOutcome::DigestMismatch);
    }
    Ok(MergeOutcome::Verified {
        stats,
        digest: wire_digest,
    })
}
