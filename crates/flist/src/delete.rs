use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use logging::Logger;

use crate::builder::local_tree;
use crate::entry::FileList;

/// Removes sink entries that the sender's list does not name.
///
/// Only entries beneath the transferred top-level directories are
/// considered (the whole sink when the list carries a `"."` root), the
/// sink root itself is never a candidate, and the walk feeding the
/// candidates never crosses a device boundary. Candidates are removed
/// deepest-first so directories are empty by the time their own turn
/// comes. With `dry_run` the removals are logged but not performed.
///
/// Returns the number of entries removed (or that would have been).
pub fn delete_extraneous(root: &Path, want: &FileList, dry_run: bool, logger: &Logger) -> u32 {
    let keep: HashSet<&str> = want.entries().iter().map(|e| e.wpath.as_str()).collect();

    let whole_sink = keep.contains(".");
    let tops: Vec<&str> = want
        .entries()
        .iter()
        .filter(|e| e.is_dir() && !e.wpath.contains('/'))
        .map(|e| e.wpath.as_str())
        .collect();

    let mut candidates = local_tree(root, logger);
    // Children sort after their parent and reversing puts them first, so
    // every directory is empty before its own removal.
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut deleted = 0u32;
    for (wpath, is_dir) in candidates {
        if keep.contains(wpath.as_str()) {
            continue;
        }
        let in_scope = whole_sink
            || tops.iter().any(|top| {
                wpath
                    .strip_prefix(top)
                    .is_some_and(|rest| rest.starts_with('/'))
            });
        if !in_scope {
            continue;
        }

        logger.info(1, format!("deleting: {wpath}"));
        deleted += 1;
        if dry_run {
            continue;
        }

        let target = root.join(&wpath);
        let result = if is_dir {
            fs::remove_dir(&target)
        } else {
            fs::remove_file(&target)
        };
        match result {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                logger.error(format!("{}: {err}", target.display()));
                deleted -= 1;
            }
        }
    }

    deleted
}
