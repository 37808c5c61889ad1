use std::fs;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use checksums::file_digest;
use engine::{apply_delta, BlockSet, MergeOutcome, MergeStats};
use filetime::FileTime;
use flist::{decode_list, delete_extraneous, FileEntry};
use logging::Logger;
use protocol::multiplex::DemuxReader;
use protocol::{
    exchange_versions, CountingReader, CountingWriter, Session, SessionStats, WireRead, WireWrite,
};

use crate::error::TransferError;
use crate::mkpath::mkpath;
use crate::temp::TempGuard;

/// The receiver's view of a finished transfer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransferSummary {
    /// Statistics reported by the sender.
    pub remote: SessionStats,
    /// Wire bytes this role read.
    pub bytes_read: u64,
    /// Wire bytes this role wrote.
    pub bytes_written: u64,
    /// Regular files whose reconstruction replaced the destination.
    pub files_updated: usize,
    /// Per-file failures that were logged and skipped.
    pub file_errors: u32,
    /// Entries removed by the deletion pass.
    pub deleted: u32,
    /// Bytes that arrived as literal runs across all merges.
    pub literal_bytes: u64,
    /// Bytes reused from basis files across all merges.
    pub matched_bytes: u64,
}

/// What one per-file exchange did to the sink.
enum FileAction {
    Updated(MergeStats),
    Unchanged(MergeStats),
    Failed,
}

/// Runs the receiving role over a duplex stream.
///
/// The receiver decodes the file list, then walks it in order: directories
/// and symlinks are handled locally, and for each regular file it sends
/// the file's index plus a block set of its current basis, reads back the
/// token stream, and merges it into a temporary that replaces the
/// destination once verified. Dry-run consumes the wire identically while
/// leaving the sink untouched.
pub fn run_receiver<R, W>(
    sess: &mut Session,
    reader: R,
    writer: W,
    sink: &Path,
) -> Result<TransferSummary, TransferError>
where
    R: Read + AsRawFd,
    W: Write,
{
    let logger = sess.logger.clone();
    let mut writer = CountingWriter::new(writer);
    let mut reader = DemuxReader::new(CountingReader::new(reader), logger.clone());

    sess.rver = exchange_versions(&mut reader, &mut writer)?;
    sess.seed = reader.read_int()?;
    reader.activate();
    logger.info(2, format!("handshake done, remote version {}", sess.rver));

    let list = decode_list(&mut reader, sess.opts.preserve_links, &logger)?;
    let remote_io_errors = reader.read_int()?;
    if remote_io_errors > 0 {
        logger.warning(format!(
            "peer reported {remote_io_errors} I/O error(s) while building the file list"
        ));
    }

    if !sess.opts.dry_run {
        mkpath(sink)?;
    }

    let mut summary = TransferSummary::default();
    let mut dir_times: Vec<(PathBuf, i64)> = Vec::new();

    for (index, entry) in list.entries().iter().enumerate() {
        let dest = sink.join(&entry.wpath);

        if entry.is_dir() {
            if sess.opts.dry_run {
                continue;
            }
            if let Err(err) = make_directory(entry, &dest, sess) {
                logger.error(format!("{}: {err}", dest.display()));
                summary.file_errors += 1;
            } else if sess.opts.preserve_times {
                dir_times.push((dest, entry.mtime));
            }
            continue;
        }
        if entry.is_symlink() {
            if sess.opts.preserve_links && !sess.opts.dry_run {
                if let Err(err) = make_symlink(entry, &dest, sess) {
                    logger.error(format!("{}: {err}", dest.display()));
                    summary.file_errors += 1;
                }
            }
            continue;
        }
        if !entry.is_file() {
            logger.warning(format!("skipping special: {}", entry.wpath));
            continue;
        }

        reader.drain_pending()?;
        match receive_file(sess, &mut reader, &mut writer, index, entry, &dest, &logger)? {
            FileAction::Updated(stats) => {
                summary.files_updated += 1;
                summary.literal_bytes += stats.literal;
                summary.matched_bytes += stats.matched;
            }
            FileAction::Unchanged(stats) => {
                summary.literal_bytes += stats.literal;
                summary.matched_bytes += stats.matched;
            }
            FileAction::Failed => summary.file_errors += 1,
        }
    }

    // Directory times go on last, deepest first, after their contents have
    // stopped changing.
    for (dir, mtime) in dir_times.iter().rev() {
        let _ = filetime::set_file_mtime(dir, FileTime::from_unix_time(*mtime, 0));
    }

    writer.write_int(-1)?;
    writer.flush()?;
    let ack = reader.read_int()?;
    if ack != -1 {
        return Err(TransferError::BadPhaseAck(ack));
    }
    summary.remote = SessionStats::recv(&mut reader)?;

    if sess.opts.del && sess.opts.recursive {
        summary.deleted = delete_extraneous(sink, &list, sess.opts.dry_run, &logger);
    }

    summary.bytes_read = reader.get_ref().bytes_read();
    summary.bytes_written = writer.bytes_written();
    logger.info(
        1,
        format!(
            "sent {} bytes  received {} bytes  total size {}",
            summary.bytes_written, summary.bytes_read, summary.remote.total_size
        ),
    );
    if summary.file_errors > 0 {
        logger.warning(format!(
            "{} file(s) could not be transferred",
            summary.file_errors
        ));
    }
    Ok(summary)
}

/// Creates a listed directory, applying permissions when asked to.
fn make_directory(entry: &FileEntry, dest: &Path, sess: &Session) -> io::Result<()> {
    mkpath(dest)?;
    if sess.opts.preserve_perms {
        fs::set_permissions(dest, fs::Permissions::from_mode(entry.perms()))?;
    }
    Ok(())
}

/// Recreates a listed symlink, replacing whatever sits at the destination.
fn make_symlink(entry: &FileEntry, dest: &Path, sess: &Session) -> io::Result<()> {
    let target = entry
        .link
        .as_deref()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "symlink without target"))?;
    if let Some(parent) = dest.parent() {
        mkpath(parent)?;
    }
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    symlink(target, dest)?;
    if sess.opts.preserve_times {
        let mtime = FileTime::from_unix_time(entry.mtime, 0);
        filetime::set_symlink_file_times(dest, mtime, mtime)?;
    }
    Ok(())
}

/// Runs one regular file's exchange: index, block set, token stream,
/// merge, metadata, rename.
fn receive_file<R, W>(
    sess: &Session,
    reader: &mut DemuxReader<CountingReader<R>>,
    writer: &mut CountingWriter<W>,
    index: usize,
    entry: &FileEntry,
    dest: &Path,
    logger: &Logger,
) -> Result<FileAction, TransferError>
where
    R: Read + AsRawFd,
    W: Write,
{
    // The block set must be complete on the wire before any token is read.
    let existing_perms = fs::symlink_metadata(dest)
        .ok()
        .filter(fs::Metadata::is_file)
        .map(|meta| meta.permissions().mode() & 0o7777);
    let basis = fs::read(dest).unwrap_or_default();
    let set = BlockSet::from_bytes(&basis, sess.seed);
    writer.write_int(index as i32)?;
    set.send(writer)?;
    writer.flush()?;
    logger.info(3, format!("requesting {} ({} blocks)", entry.wpath, set.count()));

    if sess.opts.dry_run {
        let outcome = apply_delta(reader, &basis, &set, sess.seed, &mut io::sink(), logger)?;
        return Ok(match outcome {
            MergeOutcome::Verified { stats, digest } => {
                if !basis.is_empty() && digest == file_digest(sess.seed, &basis) {
                    FileAction::Unchanged(stats)
                } else {
                    FileAction::Updated(stats)
                }
            }
            _ => FileAction::Failed,
        });
    }

    // From here on the token stream is owed to us; a local failure must
    // still consume it to keep the session in sync.
    let mut temp = match prepare_temp(dest) {
        Ok(temp) => temp,
        Err(err) => {
            logger.error(format!("{}: {err}", dest.display()));
            apply_delta(reader, &basis, &set, sess.seed, &mut io::sink(), logger)?;
            return Ok(FileAction::Failed);
        }
    };
    let outcome = apply_delta(reader, &basis, &set, sess.seed, temp.file_mut(), logger)?;

    let (stats, digest) = match outcome {
        MergeOutcome::Verified { stats, digest } => (stats, digest),
        MergeOutcome::DigestMismatch => {
            logger.error(format!("{}: checksum mismatch, file not updated", entry.wpath));
            return Ok(FileAction::Failed);
        }
        MergeOutcome::BadBlockIndex(_) | MergeOutcome::Io(_) => {
            return Ok(FileAction::Failed);
        }
    };

    if !basis.is_empty() && digest == file_digest(sess.seed, &basis) {
        // Source and basis are identical; leave the destination alone
        // apart from any requested metadata refresh.
        if let Err(err) = apply_metadata(sess, entry, dest, existing_perms) {
            logger.error(format!("{}: {err}", dest.display()));
            return Ok(FileAction::Failed);
        }
        logger.info(3, format!("{} is up to date", entry.wpath));
        return Ok(FileAction::Unchanged(stats));
    }

    let finished = apply_metadata(sess, entry, temp.path(), existing_perms)
        .and_then(|()| temp.persist(dest));
    if let Err(err) = finished {
        logger.error(format!("{}: {err}", dest.display()));
        return Ok(FileAction::Failed);
    }
    logger.info(
        2,
        format!(
            "received {}: {} literal, {} matched",
            entry.wpath, stats.literal, stats.matched
        ),
    );
    Ok(FileAction::Updated(stats))
}

/// Makes room for the merge temporary next to `dest`.
fn prepare_temp(dest: &Path) -> io::Result<TempGuard> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            mkpath(parent)?;
        }
    }
    TempGuard::create(dest)
}

/// Applies permissions and times onto a reconstructed file (or onto an
/// untouched destination when only metadata changed).
///
/// Without `-p`, an updated file keeps the permissions the destination
/// already had; a fresh file widens the temporary's 0600 to a
/// conventional default.
fn apply_metadata(
    sess: &Session,
    entry: &FileEntry,
    path: &Path,
    existing_perms: Option<u32>,
) -> io::Result<()> {
    let perms = if sess.opts.preserve_perms {
        entry.perms()
    } else {
        existing_perms.unwrap_or(0o644)
    };
    fs::set_permissions(path, fs::Permissions::from_mode(perms))?;
    if sess.opts.preserve_times {
        filetime::set_file_mtime(path, FileTime::from_unix_time(entry.mtime, 0))?;
    }
    Ok(())
}
