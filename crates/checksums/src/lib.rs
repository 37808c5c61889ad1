//! Checksum primitives for block-based delta transfer.
//!
//! Two checksums cooperate during matching: a cheap 32-bit rolling sum used
//! to locate candidate blocks while sliding a window over the source, and a
//! seeded 16-byte MD4 digest that confirms candidates and verifies whole
//! files after reconstruction.

mod rolling;
mod strong;

pub use rolling::{weak, RollingChecksum};
pub use strong::{file_digest, strong_block, FileDigest, STRONG_LEN};
