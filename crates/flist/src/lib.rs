//! The set of files one transfer moves, and how it crosses the wire.
//!
//! The sender builds the list from its command-line sources, sorts and
//! deduplicates it, and streams it to the receiver in a compact encoding
//! that reuses fields from the previous entry. Both peers end up with
//! byte-identical lists and index into them by position for the rest of
//! the session.

mod builder;
mod delete;
mod entry;
mod error;
mod wire;

pub use builder::FileListBuilder;
pub use delete::delete_extraneous;
pub use entry::{FileEntry, FileList};
pub use error::FlistError;
pub use wire::{decode_list, encode_list};
