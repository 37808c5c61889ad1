use checksums::{strong_block, weak, STRONG_LEN};
use protocol::{WireRead, WireWrite, CSUM_LENGTH_PHASE2};

use crate::error::EngineError;

/// Smallest block length ever chosen.
pub const BLOCK_LEN_MIN: usize = 700;

/// Largest block length ever chosen.
pub const BLOCK_LEN_MAX: usize = 1 << 29;

/// One checksummed range of a basis file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
    /// Byte offset within the basis file.
    pub offs: u64,
    /// Position within the block set.
    pub idx: usize,
    /// Length in bytes; equals the set's block length except possibly for
    /// the terminal block.
    pub len: usize,
    /// Weak rolling checksum of the block.
    pub weak: u32,
    /// Seeded strong digest, truncated on the wire to the set's digest
    /// length.
    pub strong: [u8; STRONG_LEN],
}

/// The receiver's description of one basis file.
///
/// All blocks share `len` bytes except the last, which holds `rem` bytes
/// when the file size is not a multiple of the block length. An absent or
/// unreadable basis is represented by the empty set, telling the sender to
/// ship the whole file as literals.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockSet {
    /// Size of the described file in bytes.
    pub size: u64,
    /// Common block length.
    pub len: usize,
    /// Terminal short-block length, 0 when the size divides evenly.
    pub rem: usize,
    /// Strong-digest truncation in bytes, 2..=16.
    pub csum: usize,
    /// Blocks in file order.
    pub blocks: Vec<Block>,
}

impl BlockSet {
    /// Block length for a file of `size` bytes: one ten-thousandth of the
    /// size rounded down to a multiple of 8, clamped to
    /// [`BLOCK_LEN_MIN`]..=[`BLOCK_LEN_MAX`].
    #[must_use]
    pub fn block_len_for(size: u64) -> usize {
        let raw = (size / 10000) & !7;
        usize::try_from(raw)
            .unwrap_or(BLOCK_LEN_MAX)
            .clamp(BLOCK_LEN_MIN, BLOCK_LEN_MAX)
    }

    /// The empty set: no basis available, everything travels literal.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the set for an in-memory basis, checksumming every block
    /// with the session seed.
    #[must_use]
    pub fn from_bytes(data: &[u8], seed: i32) -> Self {
        if data.is_empty() {
            return Self::empty();
        }
        let len = Self::block_len_for(data.len() as u64);
        let rem = data.len() % len;
        let blocks = data
            .chunks(len)
            .enumerate()
            .map(|(idx, chunk)| Block {
                offs: (idx * len) as u64,
                idx,
                len: chunk.len(),
                weak: weak(chunk),
                strong: strong_block(seed, chunk),
            })
            .collect();
        Self {
            size: data.len() as u64,
            len,
            rem,
            csum: CSUM_LENGTH_PHASE2,
            blocks,
        }
    }

    /// Number of blocks in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` for the empty (no-basis) set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Writes the set header and per-block checksums.
    pub fn send<W: WireWrite>(&self, writer: &mut W) -> Result<(), EngineError> {
        writer.write_size(self.count())?;
        writer.write_size(self.len)?;
        writer.write_size(self.csum)?;
        writer.write_size(self.rem)?;
        for block in &self.blocks {
            writer.write_int(block.weak as i32)?;
            writer.write_buf(&block.strong[..self.csum])?;
        }
        Ok(())
    }

    /// Reads a peer's set, reconstructing offsets and the described size.
    pub fn recv<R: WireRead>(reader: &mut R) -> Result<Self, EngineError> {
        let count = reader.read_size()?;
        let len = reader.read_size()?;
        let csum = reader.read_size()?;
        let rem = reader.read_size()?;

        if count == 0 {
            // An empty set still carries all four header fields.
            return Ok(Self::empty());
        }
        if len == 0 || rem >= len {
            return Err(EngineError::BadBlockHeader(count, len, rem));
        }
        if !(2..=STRONG_LEN).contains(&csum) {
            return Err(EngineError::BadDigestLength(csum));
        }

        let mut blocks = Vec::with_capacity(count.min(1 << 20));
        for idx in 0..count {
            let weak = reader.read_int()? as u32;
            let mut strong = [0u8; STRONG_LEN];
            reader.read_buf(&mut strong[..csum])?;
            let block_len = if idx + 1 == count && rem > 0 { rem } else { len };
            blocks.push(Block {
                offs: (idx * len) as u64,
                idx,
                len: block_len,
                weak,
                strong,
            });
        }

        let size = ((count - 1) * len + if rem > 0 { rem } else { len }) as u64;
        Ok(Self {
            size,
            len,
            rem,
            csum,
            blocks,
        })
    }
}
