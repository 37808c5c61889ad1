use checksums::{file_digest, strong_block, RollingChecksum, STRONG_LEN};
use protocol::{WireWrite, MAX_CHUNK};
use rustc_hash::FxHashMap;

use crate::blocks::BlockSet;
use crate::error::EngineError;

/// Two-level lookup over a block set's weak checksums.
///
/// Blocks are bucketed on the low 16 bits of their weak checksum; a probe
/// first filters candidates on the full 32-bit value and window length,
/// then confirms with the truncated strong digest. Candidates keep block
/// order, so the earliest block wins when several carry identical content.
#[derive(Debug)]
pub struct DeltaIndex<'a> {
    set: &'a BlockSet,
    buckets: FxHashMap<u16, Vec<usize>>,
}

impl<'a> DeltaIndex<'a> {
    /// Indexes `set` for matching.
    #[must_use]
    pub fn new(set: &'a BlockSet) -> Self {
        let mut buckets: FxHashMap<u16, Vec<usize>> = FxHashMap::default();
        for block in &set.blocks {
            buckets
                .entry((block.weak & 0xffff) as u16)
                .or_default()
                .push(block.idx);
        }
        Self { set, buckets }
    }

    /// Looks for a block matching the window, confirming weak-checksum
    /// hits against the strong digest. The digest is computed at most once
    /// per probe.
    #[must_use]
    pub fn find(&self, weak: u32, window: &[u8], seed: i32) -> Option<usize> {
        let candidates = self.buckets.get(&((weak & 0xffff) as u16))?;
        let mut strong: Option<[u8; STRONG_LEN]> = None;
        for &idx in candidates {
            let block = &self.set.blocks[idx];
            if block.weak != weak || block.len != window.len() {
                continue;
            }
            let digest = strong.get_or_insert_with(|| strong_block(seed, window));
            if digest[..self.set.csum] == block.strong[..self.set.csum] {
                return Some(idx);
            }
        }
        None
    }
}

/// Byte accounting for one generated token stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeltaStats {
    /// Bytes shipped verbatim.
    pub literal: u64,
    /// Bytes covered by block references.
    pub matched: u64,
}

/// Scans `source` against `set` and writes the token stream.
///
/// Positive tokens announce a literal run of that many bytes (runs are
/// split at [`MAX_CHUNK`]); negative tokens reference block `-token - 1`;
/// a zero token ends the file and is followed by the 16-byte whole-file
/// digest. Matching is greedy: the window advances by a whole block on a
/// hit and by one byte otherwise, with the rolling checksum carried across
/// single-byte steps.
pub fn generate_delta<W: WireWrite>(
    writer: &mut W,
    source: &[u8],
    set: &BlockSet,
    seed: i32,
) -> Result<DeltaStats, EngineError> {
    let mut stats = DeltaStats::default();

    if !set.is_empty() {
        let index = DeltaIndex::new(set);
        let len = set.len;
        let rem = set.rem;
        let mut sum = RollingChecksum::new();
        let mut lit_start = 0usize;
        let mut pos = 0usize;

        while pos < source.len() {
            let remaining = source.len() - pos;
            let window = if remaining >= len {
                len
            } else if rem > 0 && remaining == rem {
                // Narrow to the terminal block's width.
                rem
            } else if rem > 0 && remaining > rem {
                // Too short for a full block, too long for the terminal
                // one; nothing can match until the widths line up.
                pos = source.len() - rem;
                continue;
            } else {
                break;
            };

            if sum.len() != window {
                sum.seed(&source[pos..pos + window]);
            }

            if let Some(idx) = index.find(sum.value(), &source[pos..pos + window], seed) {
                flush_literals(writer, &source[lit_start..pos], &mut stats)?;
                writer.write_int(-(idx as i32) - 1)?;
                stats.matched += window as u64;
                pos += window;
                lit_start = pos;
                sum.reset();
            } else {
                if pos + window < source.len() {
                    sum.roll(source[pos], source[pos + window]);
                } else {
                    sum.reset();
                }
                pos += 1;
            }
        }

        flush_literals(writer, &source[lit_start..], &mut stats)?;
    } else {
        flush_literals(writer, source, &mut stats)?;
    }

    writer.write_int(0)?;
    writer.write_buf(&file_digest(seed, source))?;
    Ok(stats)
}

fn flush_literals<W: WireWrite>(
    writer: &mut W,
    run: &[u8],
    stats: &mut DeltaStats,
) -> Result<(), EngineError> {
    for chunk in run.chunks(MAX_CHUNK) {
        writer.write_int(chunk.len() as i32)?;
        writer.write_buf(chunk)?;
    }
    stats.literal += run.len() as u64;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::WireRead;
    use std::io::Cursor;

    /// Decoded view of a token stream for assertions.
    #[derive(Debug, Eq, PartialEq)]
    enum Token {
        Literal(Vec<u8>),
        Match(usize),
    }

    fn decode_tokens(buf: &[u8]) -> (Vec<Token>, [u8; 16]) {
        let mut reader = Cursor::new(buf);
        let mut tokens = Vec::new();
        loop {
            let token = reader.read_int().unwrap();
            if token == 0 {
                break;
            }
            if token > 0 {
                let mut data = vec![0u8; token as usize];
                reader.read_buf(&mut data).unwrap();
                tokens.push(Token::Literal(data));
            } else {
                tokens.push(Token::Match((-i64::from(token) - 1) as usize));
            }
        }
        let mut digest = [0u8; 16];
        reader.read_buf(&mut digest).unwrap();
        assert_eq!(reader.position() as usize, buf.len());
        (tokens, digest)
    }

    fn delta(source: &[u8], basis: &[u8], seed: i32) -> (Vec<Token>, [u8; 16], DeltaStats) {
        let set = BlockSet::from_bytes(basis, seed);
        let mut buf = Vec::new();
        let stats = generate_delta(&mut buf, source, &set, seed).unwrap();
        let (tokens, digest) = decode_tokens(&buf);
        (tokens, digest, stats)
    }

    #[test]
    fn empty_set_ships_everything_literal() {
        let source = b"entirely new contents".to_vec();
        let (tokens, digest, stats) = delta(&source, b"", 7);
        assert_eq!(tokens, [Token::Literal(source.clone())]);
        assert_eq!(digest, file_digest(7, &source));
        assert_eq!(stats.literal, source.len() as u64);
        assert_eq!(stats.matched, 0);
    }

    #[test]
    fn identical_files_are_all_matches() {
        let source: Vec<u8> = (0..3000u32).map(|i| (i % 253) as u8).collect();
        let (tokens, _, stats) = delta(&source, &source, 1);
        assert_eq!(
            tokens,
            [Token::Match(0), Token::Match(1), Token::Match(2), Token::Match(3), Token::Match(4)]
        );
        assert_eq!(stats.literal, 0);
        assert_eq!(stats.matched, 3000);
    }

    #[test]
    fn changed_first_block_is_one_literal_run() {
        // Same-length prefixes keep the block grid aligned, so everything
        // from the second block on matches; the first block rides literal.
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut basis = b"AAAA".to_vec();
        basis.extend_from_slice(&payload);
        let mut source = b"BBBB".to_vec();
        source.extend_from_slice(&payload);

        let set = BlockSet::from_bytes(&basis, 9);
        let (tokens, _, stats) = delta(&source, &basis, 9);

        match &tokens[0] {
            Token::Literal(run) => assert_eq!(run.len(), set.len),
            other => panic!("expected leading literal, got {other:?}"),
        }
        assert_eq!(stats.literal, set.len as u64);
        assert_eq!(stats.matched, source.len() as u64 - set.len as u64);
        assert!(tokens[1..]
            .iter()
            .enumerate()
            .all(|(i, t)| *t == Token::Match(i + 1)));
    }

    #[test]
    fn terminal_short_block_matches() {
        // 700 + 300: block 1 is the short terminal block.
        let source: Vec<u8> = (0..1000u32).map(|i| (i % 247) as u8).collect();
        let basis = source.clone();
        let (tokens, _, stats) = delta(&source, &basis, 4);
        assert_eq!(tokens, [Token::Match(0), Token::Match(1)]);
        assert_eq!(stats.matched, 1000);
    }

    #[test]
    fn appended_tail_is_trailing_literal() {
        let basis: Vec<u8> = (0..1400u32).map(|i| (i % 239) as u8).collect();
        let mut source = basis.clone();
        source.extend_from_slice(b"tail");

        let (tokens, _, stats) = delta(&source, &basis, 2);
        assert_eq!(
            tokens,
            [
                Token::Match(0),
                Token::Match(1),
                Token::Literal(b"tail".to_vec())
            ]
        );
        assert_eq!(stats.literal, 4);
    }

    #[test]
    fn literal_runs_split_at_max_chunk() {
        let source = vec![5u8; MAX_CHUNK + 100];
        let (tokens, _, _) = delta(&source, b"", 3);
        assert_eq!(tokens.len(), 2);
        match (&tokens[0], &tokens[1]) {
            (Token::Literal(a), Token::Literal(b)) => {
                assert_eq!(a.len(), MAX_CHUNK);
                assert_eq!(b.len(), 100);
            }
            other => panic!("unexpected tokens: {other:?}"),
        }
    }

    #[test]
    fn earliest_block_wins_on_duplicate_content() {
        let basis = vec![1u8; 2100]; // three identical 700-byte blocks
        let source = vec![1u8; 700];
        let (tokens, _, _) = delta(&source, &basis, 6);
        assert_eq!(tokens, [Token::Match(0)]);
    }

    #[test]
    fn differing_content_never_matches() {
        let basis: Vec<u8> = (0..700u32).map(|i| (i % 256) as u8).collect();
        let set = BlockSet::from_bytes(&basis, 5);
        let index = DeltaIndex::new(&set);
        let mut window = basis.clone();
        window[0] = basis[0].wrapping_add(1);
        window[699] = basis[699].wrapping_sub(1);
        // Whether or not the weak sums collide, the strong digest must
        // reject the candidate.
        let weak = checksums::weak(&window);
        assert_eq!(index.find(weak, &window, 5), None);
    }

    #[test]
    fn empty_source_is_just_the_digest() {
        let basis = vec![8u8; 1400];
        let (tokens, digest, stats) = delta(b"", &basis, 11);
        assert!(tokens.is_empty());
        assert_eq!(digest, file_digest(11, b""));
        assert_eq!(stats, DeltaStats::default());
    }
}
