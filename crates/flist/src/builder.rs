use std::fs;
use std::path::{Path, PathBuf};

use logging::Logger;

use crate::entry::{FileEntry, FileList};
use crate::error::FlistError;

/// Builds the transfer set from command-line source arguments.
///
/// Unreadable entries are warned about and tallied rather than aborting
/// the run; the tally travels after the encoded list so the peer can
/// account for the gap. The finished list is sorted by working path and
/// deduplicated.
#[derive(Debug)]
pub struct FileListBuilder<'a> {
    recursive: bool,
    preserve_links: bool,
    logger: &'a Logger,
}

impl<'a> FileListBuilder<'a> {
    /// Creates a builder; flags default to off.
    #[must_use]
    pub fn new(logger: &'a Logger) -> Self {
        Self {
            recursive: false,
            preserve_links: false,
            logger,
        }
    }

    /// Descend into directory arguments instead of skipping them.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Include symlinks as symlink entries instead of skipping them.
    #[must_use]
    pub fn preserve_links(mut self, preserve_links: bool) -> Self {
        self.preserve_links = preserve_links;
        self
    }

    /// Generates, sorts and deduplicates the list for `sources`.
    pub fn build(&self, sources: &[String]) -> Result<FileList, FlistError> {
        let mut entries = Vec::new();
        let mut io_errors = 0u32;

        for source in sources {
            if source.is_empty() {
                continue;
            }
            if self.recursive {
                self.gen_recursive(source, &mut entries, &mut io_errors);
            } else {
                self.gen_file(source, &mut entries, &mut io_errors);
            }
        }

        let mut list = FileList::new(entries, io_errors);
        list.sort_and_dedupe(self.logger)?;
        self.logger
            .info(2, format!("generated {} filenames", list.len()));
        Ok(list)
    }

    /// Handles one non-recursive argument: exactly that file.
    fn gen_file(&self, source: &str, entries: &mut Vec<FileEntry>, io_errors: &mut u32) {
        let meta = match fs::symlink_metadata(source) {
            Ok(meta) => meta,
            Err(err) => {
                self.logger.warning(format!("{source}: {err}"));
                *io_errors += 1;
                return;
            }
        };

        if meta.is_dir() {
            self.logger.warning(format!("skipping directory: {source}"));
            return;
        }

        let wpath = source
            .rfind('/')
            .map_or(source, |at| &source[at + 1..])
            .to_owned();
        self.push_entry(PathBuf::from(source), wpath, &meta, entries, io_errors);
    }

    /// Handles one recursive argument: the directory and all descendants.
    ///
    /// A trailing slash means "contents only": the named directory itself
    /// travels as `"."` and descendants drop the whole source prefix.
    /// Without it, the last path component is kept.
    fn gen_recursive(&self, source: &str, entries: &mut Vec<FileEntry>, io_errors: &mut u32) {
        let contents_only = source.ends_with('/');
        let mut root = source.trim_end_matches('/').to_owned();
        if root.is_empty() {
            root.push('/');
        }

        let meta = match fs::symlink_metadata(&root) {
            Ok(meta) => meta,
            Err(err) => {
                self.logger.warning(format!("{root}: {err}"));
                *io_errors += 1;
                return;
            }
        };

        if !meta.is_dir() {
            // A plain file or symlink argument falls back to the
            // non-recursive shape.
            self.gen_file(&root, entries, io_errors);
            return;
        }

        let strip = if contents_only {
            root.len() + 1
        } else {
            root.rfind('/').map_or(0, |at| at + 1)
        };

        self.visit(&root, strip, entries, io_errors);
    }

    fn visit(&self, path: &str, strip: usize, entries: &mut Vec<FileEntry>, io_errors: &mut u32) {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                self.logger.warning(format!("{path}: {err}"));
                *io_errors += 1;
                return;
            }
        };

        let wpath = if path.len() <= strip {
            ".".to_owned()
        } else {
            path[strip..].to_owned()
        };

        if meta.is_dir() {
            entries.push(FileEntry::from_metadata(PathBuf::from(path), wpath, &meta));
            let mut names = Vec::new();
            match fs::read_dir(path) {
                Ok(dir) => {
                    for child in dir {
                        match child {
                            Ok(child) => names.push(child.file_name()),
                            Err(err) => {
                                self.logger.warning(format!("{path}: {err}"));
                                *io_errors += 1;
                            }
                        }
                    }
                }
                Err(err) => {
                    self.logger.warning(format!("{path}: {err}"));
                    *io_errors += 1;
                    return;
                }
            }
            names.sort();
            for name in names {
                let child = format!("{path}/{}", name.to_string_lossy());
                self.visit(&child, strip, entries, io_errors);
            }
        } else {
            self.push_entry(PathBuf::from(path), wpath, &meta, entries, io_errors);
        }
    }

    /// Appends a non-directory entry, resolving symlink targets.
    fn push_entry(
        &self,
        path: PathBuf,
        wpath: String,
        meta: &fs::Metadata,
        entries: &mut Vec<FileEntry>,
        io_errors: &mut u32,
    ) {
        if meta.file_type().is_symlink() {
            if !self.preserve_links {
                self.logger
                    .warning(format!("skipping symlink: {}", path.display()));
                return;
            }
            let target = match fs::read_link(&path) {
                Ok(target) => target,
                Err(err) => {
                    self.logger
                        .warning(format!("{}: {err}", path.display()));
                    *io_errors += 1;
                    return;
                }
            };
            let mut entry = FileEntry::from_metadata(path, wpath, meta);
            entry.link = Some(target.to_string_lossy().into_owned());
            entries.push(entry);
            return;
        }

        if !meta.is_file() {
            self.logger
                .warning(format!("skipping special: {}", path.display()));
            return;
        }

        entries.push(FileEntry::from_metadata(path, wpath, meta));
    }
}

/// Builds the receiver's view of an existing sink tree.
///
/// Working paths are relative to `root`, which itself is not listed.
/// Traversal never crosses a device boundary; foreign mounts under the
/// sink are invisible to the deletion pass that consumes this list.
pub(crate) fn local_tree(root: &Path, logger: &Logger) -> Vec<(String, bool)> {
    use std::os::unix::fs::MetadataExt;

    let Ok(root_meta) = fs::symlink_metadata(root) else {
        return Vec::new();
    };
    let device = root_meta.dev();
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                logger.warning(format!("{}: {err}", dir.display()));
                continue;
            }
        };
        for child in entries.flatten() {
            let path = child.path();
            let Ok(meta) = fs::symlink_metadata(&path) else {
                continue;
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let wpath = rel.to_string_lossy().into_owned();
            let is_dir = meta.is_dir() && !meta.file_type().is_symlink();
            if is_dir && meta.dev() != device {
                logger.warning(format!("not crossing mount point: {}", path.display()));
                continue;
            }
            found.push((wpath, is_dir));
            if is_dir {
                stack.push(path);
            }
        }
    }

    found
}
