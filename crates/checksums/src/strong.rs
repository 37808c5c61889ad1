use digest::Digest;
use md4::Md4;

/// Length in bytes of a full strong digest.
pub const STRONG_LEN: usize = 16;

/// Strong digest of a single block, keyed by the session seed.
///
/// The seed is hashed *before* the payload. Per-file digests hash it
/// *after* the payload (see [`file_digest`]); the asymmetry is mandated by
/// the wire protocol and both orders must be kept exactly as they are.
#[must_use]
pub fn strong_block(seed: i32, data: &[u8]) -> [u8; STRONG_LEN] {
    let mut hasher = Md4::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(data);
    hasher.finalize().into()
}

/// One-shot whole-file digest, keyed by the session seed.
#[must_use]
pub fn file_digest(seed: i32, data: &[u8]) -> [u8; STRONG_LEN] {
    let mut hasher = FileDigest::new(seed);
    hasher.update(data);
    hasher.finalize()
}

/// Streaming whole-file digest.
///
/// The merger feeds every byte it writes into one of these so the
/// reconstructed file can be verified without a second pass over disk.
#[derive(Clone, Debug)]
pub struct FileDigest {
    inner: Md4,
    seed: i32,
}

impl FileDigest {
    /// Creates a hasher for the given session seed.
    #[must_use]
    pub fn new(seed: i32) -> Self {
        Self {
            inner: Md4::new(),
            seed,
        }
    }

    /// Feeds payload bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Appends the trailing seed and returns the 16-byte digest.
    #[must_use]
    pub fn finalize(mut self) -> [u8; STRONG_LEN] {
        self.inner.update(self.seed.to_le_bytes());
        self.inner.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        use std::fmt::Write as _;

        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
        }
        out
    }

    #[test]
    fn md4_matches_rfc_vectors() {
        // Seed 0 contributes four zero bytes; check against MD4("\0\0\0\0" || input)
        // indirectly by checking the raw primitive through the block digest of
        // an empty payload with a known seed-only preimage.
        let vectors = [
            (b"".as_slice(), "31d6cfe0d16ae931b73c59d7e0c089c0"),
            (b"abc".as_slice(), "a448017aaf21d8525fc10ae87aa6729d"),
            (
                b"message digest".as_slice(),
                "d9130a8164549fe818874806e1c7014b",
            ),
        ];
        for (input, expected) in vectors {
            let digest: [u8; 16] = {
                let mut hasher = Md4::new();
                hasher.update(input);
                hasher.finalize().into()
            };
            assert_eq!(to_hex(&digest), expected);
        }
    }

    #[test]
    fn block_digest_hashes_seed_first() {
        let seed: i32 = 0x1234_5678;
        let data = b"block payload";

        let mut manual = Md4::new();
        manual.update(seed.to_le_bytes());
        manual.update(data);
        let expected: [u8; 16] = manual.finalize().into();

        assert_eq!(strong_block(seed, data), expected);
    }

    #[test]
    fn file_digest_hashes_seed_last() {
        let seed: i32 = -99;
        let data = b"whole file contents";

        let mut manual = Md4::new();
        manual.update(data);
        manual.update(seed.to_le_bytes());
        let expected: [u8; 16] = manual.finalize().into();

        assert_eq!(file_digest(seed, data), expected);
    }

    #[test]
    fn seed_order_asymmetry_is_observable() {
        let seed = 42;
        let data = b"same payload";
        assert_ne!(strong_block(seed, data), file_digest(seed, data));
    }

    #[test]
    fn streaming_matches_one_shot() {
        let seed = 7;
        let data = b"streamed in several uneven pieces";
        let mut hasher = FileDigest::new(seed);
        hasher.update(&data[..5]);
        hasher.update(&data[5..6]);
        hasher.update(&data[6..]);
        assert_eq!(hasher.finalize(), file_digest(seed, data));
    }

    #[test]
    fn different_seeds_differ() {
        let data = b"identical payload";
        assert_ne!(strong_block(1, data), strong_block(2, data));
        assert_ne!(file_digest(1, data), file_digest(2, data));
    }
}
