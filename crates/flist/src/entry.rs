use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use logging::Logger;

use crate::error::FlistError;

const S_IFMT: u32 = libc::S_IFMT as u32;
const S_IFREG: u32 = libc::S_IFREG as u32;
const S_IFDIR: u32 = libc::S_IFDIR as u32;
const S_IFLNK: u32 = libc::S_IFLNK as u32;

/// One file in the transfer set.
///
/// `path` addresses the file locally (the sender reads from it); `wpath`
/// is what crosses the wire and what the receiver resolves against its
/// sink root. Owner and group are captured but never transmitted on this
/// protocol surface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    /// Local path used to open the file.
    pub path: PathBuf,
    /// Working path: relative, normalized, unique within the list.
    pub wpath: String,
    /// Full stat mode, file type bits included.
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Size in bytes; 0 for directories and symlinks.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Symlink target; present iff the mode says symlink.
    pub link: Option<String>,
}

impl FileEntry {
    /// Builds an entry from local stat information.
    #[must_use]
    pub fn from_metadata(path: PathBuf, wpath: String, meta: &Metadata) -> Self {
        Self {
            path,
            wpath,
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            size: if meta.is_file() { meta.size() } else { 0 },
            mtime: meta.mtime(),
            link: None,
        }
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Returns `true` for symbolic links.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Permission bits only, type bits stripped.
    #[must_use]
    pub const fn perms(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// Returns `true` when a raw mode value denotes a symlink.
#[must_use]
pub(crate) const fn mode_is_symlink(mode: u32) -> bool {
    mode & S_IFMT == S_IFLNK
}

/// An ordered, deduplicated set of [`FileEntry`] values.
///
/// Treated as an immutable snapshot once exchanged: both peers index into
/// it by position for the per-file phase.
#[derive(Clone, Debug, Default)]
pub struct FileList {
    entries: Vec<FileEntry>,
    io_errors: u32,
}

impl FileList {
    /// Wraps raw entries; callers normalize via [`sort_and_dedupe`](Self::sort_and_dedupe).
    #[must_use]
    pub fn new(entries: Vec<FileEntry>, io_errors: u32) -> Self {
        Self { entries, io_errors }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    /// Borrows all entries in order.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Per-file I/O errors accumulated while building the list; transmitted
    /// after the entries so the peer can account for the gap.
    #[must_use]
    pub const fn io_errors(&self) -> u32 {
        self.io_errors
    }

    /// Adds to the I/O error tally.
    pub fn add_io_errors(&mut self, count: u32) {
        self.io_errors += count;
    }

    /// Sum of all listed file sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    /// Sorts by working path and drops duplicates.
    ///
    /// A repeated working path naming the same source file is dropped with
    /// a warning; the same working path for two *different* sources is an
    /// error, since the receiver would silently lose one of them.
    pub fn sort_and_dedupe(&mut self, logger: &Logger) -> Result<(), FlistError> {
        self.entries.sort_by(|a, b| a.wpath.cmp(&b.wpath));
        let mut result: Vec<FileEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match result.last() {
                Some(prev) if prev.wpath == entry.wpath => {
                    if prev.path == entry.path {
                        logger.warning(format!(
                            "duplicate path: {} ({})",
                            entry.wpath,
                            entry.path.display()
                        ));
                    } else {
                        return Err(FlistError::DuplicateWorkingPath(entry.wpath));
                    }
                }
                _ => result.push(entry),
            }
        }
        self.entries = result;
        Ok(())
    }

    /// Sorts by working path without deduplication; the decode side only
    /// needs ordering, the sender already deduplicated.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.wpath.cmp(&b.wpath));
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(wpath: &str, path: &str) -> FileEntry {
        FileEntry {
            path: PathBuf::from(path),
            wpath: wpath.to_owned(),
            mode: S_IFREG | 0o644,
            uid: 0,
            gid: 0,
            size: 1,
            mtime: 0,
            link: None,
        }
    }

    #[test]
    fn type_predicates_follow_mode_bits() {
        let mut e = entry("a", "a");
        assert!(e.is_file());
        e.mode = S_IFDIR | 0o755;
        assert!(e.is_dir());
        e.mode = S_IFLNK | 0o777;
        assert!(e.is_symlink());
        assert_eq!(e.perms(), 0o777);
    }

    #[test]
    fn sort_orders_by_working_path() {
        let mut list = FileList::new(vec![entry("b", "b"), entry("a", "a")], 0);
        list.sort();
        assert_eq!(list.get(0).unwrap().wpath, "a");
        assert_eq!(list.get(1).unwrap().wpath, "b");
    }

    #[test]
    fn dedupe_drops_identical_duplicates() {
        let mut list = FileList::new(vec![entry("a", "src/a"), entry("a", "src/a")], 0);
        list.sort_and_dedupe(&Logger::with_sink(0, Vec::new())).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn dedupe_rejects_conflicting_duplicates() {
        let mut list = FileList::new(vec![entry("a", "one/a"), entry("a", "two/a")], 0);
        assert!(matches!(
            list.sort_and_dedupe(&Logger::with_sink(0, Vec::new())),
            Err(FlistError::DuplicateWorkingPath(_))
        ));
    }

    #[test]
    fn total_size_sums_entries() {
        let mut a = entry("a", "a");
        a.size = 10;
        let mut b = entry("b", "b");
        b.size = 32;
        assert_eq!(FileList::new(vec![a, b], 0).total_size(), 42);
    }
}
