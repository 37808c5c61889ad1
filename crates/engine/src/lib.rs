//! The delta-transfer engine.
//!
//! The receiver describes each basis file as a [`BlockSet`] of checksummed
//! fixed-size blocks. The sender scans its authoritative copy against that
//! set with a rolling window and emits a token stream of block references
//! and literal runs, terminated by a whole-file digest. The receiver then
//! merges tokens with its basis to reconstruct the file and verifies the
//! digest before the result replaces the destination.

mod blocks;
mod delta;
mod error;
mod merge;

pub use blocks::{Block, BlockSet, BLOCK_LEN_MAX, BLOCK_LEN_MIN};
pub use delta::{generate_delta, DeltaIndex, DeltaStats};
pub use error::EngineError;
pub use merge::{apply_delta, MergeOutcome, MergeStats};
