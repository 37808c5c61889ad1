//! On-wire encoding of the file list.
//!
//! Each entry is introduced by a status byte whose flags say which fields
//! are inherited from the previous entry: a shared pathname prefix, the
//! modification time, the mode. A zero status byte terminates the list,
//! so an entry's flags must never collapse to zero — the long-name flag is
//! forced on when nothing else is set.

use logging::Logger;

use protocol::{WireRead, WireWrite};

use crate::entry::{mode_is_symlink, FileEntry, FileList};
use crate::error::FlistError;

/// Mode equals the previous entry's.
const FLIST_MODE_SAME: u8 = 0x02;
/// Pathname shares a prefix with the previous entry's.
const FLIST_NAME_SAME: u8 = 0x20;
/// Pathname suffix length is wider than one byte.
const FLIST_NAME_LONG: u8 = 0x40;
/// Modification time equals the previous entry's.
const FLIST_TIME_SAME: u8 = 0x80;

fn shared_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count().min(255)
}

/// Streams `list` to the peer, entry fields gated by the status byte.
///
/// Symlink targets travel only when `preserve_links` is on; the peer
/// decodes with the same flag, so both sides agree on the field layout.
pub fn encode_list<W: WireWrite>(
    writer: &mut W,
    list: &FileList,
    preserve_links: bool,
) -> Result<(), FlistError> {
    let mut prev: Option<&FileEntry> = None;

    for entry in list {
        let name = entry.wpath.as_bytes();
        let mut flags = 0u8;

        let prefix = prev.map_or(0, |p| shared_prefix(p.wpath.as_bytes(), name));
        if prefix > 0 {
            flags |= FLIST_NAME_SAME;
        }
        let suffix = &name[prefix..];
        if suffix.len() > u8::MAX as usize {
            flags |= FLIST_NAME_LONG;
        }
        if let Some(p) = prev {
            if p.mtime == entry.mtime {
                flags |= FLIST_TIME_SAME;
            }
            if p.mode == entry.mode {
                flags |= FLIST_MODE_SAME;
            }
        }
        if flags == 0 {
            // A bare zero would read as the end-of-list sentinel.
            flags = FLIST_NAME_LONG;
        }

        writer.write_byte(flags)?;
        if flags & FLIST_NAME_SAME != 0 {
            writer.write_byte(prefix as u8)?;
        }
        if flags & FLIST_NAME_LONG != 0 {
            writer.write_size(suffix.len())?;
        } else {
            writer.write_byte(suffix.len() as u8)?;
        }
        writer.write_buf(suffix)?;

        writer.write_long(entry.size as i64)?;
        if flags & FLIST_TIME_SAME == 0 {
            writer.write_int(entry.mtime as i32)?;
        }
        if flags & FLIST_MODE_SAME == 0 {
            writer.write_int(entry.mode as i32)?;
        }

        if entry.is_symlink() && preserve_links {
            let target = entry.link.as_deref().unwrap_or_default();
            writer.write_size(target.len())?;
            writer.write_buf(target.as_bytes())?;
        }

        prev = Some(entry);
    }

    writer.write_byte(0)?;
    Ok(())
}

/// Decodes a peer's list, reconstructing inherited fields.
///
/// Pathnames are validated before use: empty, absolute, or
/// `..`-containing names terminate the session, since the receiver
/// resolves every working path under its sink root.
pub fn decode_list<R: WireRead>(
    reader: &mut R,
    preserve_links: bool,
    logger: &Logger,
) -> Result<FileList, FlistError> {
    let mut entries: Vec<FileEntry> = Vec::new();
    let mut last_name: Vec<u8> = Vec::new();

    loop {
        let flags = reader.read_byte()?;
        if flags == 0 {
            break;
        }

        let prefix = if flags & FLIST_NAME_SAME != 0 {
            if entries.is_empty() {
                return Err(FlistError::ReuseWithoutPrevious);
            }
            usize::from(reader.read_byte()?)
        } else {
            0
        };
        if prefix > last_name.len() {
            return Err(FlistError::BadPrefix {
                prefix,
                len: last_name.len(),
            });
        }

        let suffix_len = if flags & FLIST_NAME_LONG != 0 {
            reader.read_size()?
        } else {
            usize::from(reader.read_byte()?)
        };
        if prefix + suffix_len == 0 {
            return Err(FlistError::EmptyName);
        }

        let mut name = Vec::with_capacity(prefix + suffix_len);
        name.extend_from_slice(&last_name[..prefix]);
        let start = name.len();
        name.resize(start + suffix_len, 0);
        reader.read_buf(&mut name[start..])?;

        let wpath = String::from_utf8_lossy(&name).into_owned();
        check_wpath(&wpath)?;
        last_name = name;

        let size = reader.read_long()?;
        if size < 0 {
            return Err(protocol::ProtocolError::NegativeSize(size).into());
        }

        let mtime = if flags & FLIST_TIME_SAME != 0 {
            entries
                .last()
                .ok_or(FlistError::ReuseWithoutPrevious)?
                .mtime
        } else {
            i64::from(reader.read_int()?)
        };

        let mode = if flags & FLIST_MODE_SAME != 0 {
            entries.last().ok_or(FlistError::ReuseWithoutPrevious)?.mode
        } else {
            reader.read_int()? as u32
        };

        let link = if mode_is_symlink(mode) && preserve_links {
            let len = reader.read_size()?;
            if len == 0 {
                return Err(FlistError::EmptyLinkTarget(wpath));
            }
            let mut target = vec![0u8; len];
            reader.read_buf(&mut target)?;
            Some(String::from_utf8_lossy(&target).into_owned())
        } else {
            None
        };

        logger.info(
            3,
            format!("received file metadata: {wpath} (size {size}, mode {mode:o})"),
        );

        entries.push(FileEntry {
            path: wpath.clone().into(),
            wpath,
            mode,
            uid: 0,
            gid: 0,
            size: size as u64,
            mtime,
            link,
        });
    }

    let mut list = FileList::new(entries, 0);
    list.sort();
    logger.info(2, format!("received {} filenames", list.len()));
    Ok(list)
}

fn check_wpath(wpath: &str) -> Result<(), FlistError> {
    if wpath.starts_with('/') {
        return Err(FlistError::AbsolutePath(wpath.to_owned()));
    }
    if wpath.split('/').any(|component| component == "..") {
        return Err(FlistError::Backtracking(wpath.to_owned()));
    }
    Ok(())
}
