use std::fs;
use std::io::{Read, Write};

use engine::{generate_delta, BlockSet};
use flist::{encode_list, FileListBuilder};
use protocol::multiplex::{MessageCode, MuxWriter};
use protocol::{
    exchange_versions, CountingReader, CountingWriter, Session, SessionStats, WireRead, WireWrite,
};

use crate::error::TransferError;

/// Runs the sending role over a duplex stream.
///
/// The sender writes the file list, then answers each file index the
/// receiver requests with a token stream scanned against the receiver's
/// block set, and finally acknowledges end-of-phase and reports its
/// statistics. Everything written after the seed travels multiplexed;
/// everything read arrives plain.
pub fn run_sender<R, W>(
    sess: &mut Session,
    reader: R,
    writer: W,
    sources: &[String],
) -> Result<SessionStats, TransferError>
where
    R: Read,
    W: Write,
{
    let logger = sess.logger.clone();
    let mut reader = CountingReader::new(reader);
    let mut writer = MuxWriter::new(CountingWriter::new(writer));

    sess.rver = exchange_versions(&mut reader, &mut writer)?;
    sess.seed = pick_seed();
    writer.write_int(sess.seed)?;
    writer.flush()?;
    writer.activate();
    logger.info(2, format!("handshake done, remote version {}", sess.rver));

    let list = FileListBuilder::new(&logger)
        .recursive(sess.opts.recursive)
        .preserve_links(sess.opts.preserve_links)
        .build(sources)?;
    encode_list(&mut writer, &list, sess.opts.preserve_links)?;
    writer.write_int(list.io_errors() as i32)?;
    writer.flush()?;
    logger.info(2, format!("sent file metadata list: {}", list.len()));

    loop {
        let index = reader.read_int()?;
        if index == -1 {
            break;
        }
        let entry = usize::try_from(index)
            .ok()
            .and_then(|idx| list.get(idx))
            .ok_or(TransferError::BadFileIndex {
                index,
                count: list.len(),
            })?;
        if !entry.is_file() {
            return Err(TransferError::NotRegular { index });
        }

        let set = BlockSet::recv(&mut reader)?;
        let source = fs::read(&entry.path).map_err(|err| {
            // The receiver is already waiting on this token stream; the
            // best that can be done is to say why before dying.
            let _ = writer.send_message(
                MessageCode::ErrorXfer,
                &format!("{}: {err}", entry.path.display()),
            );
            TransferError::SourceVanished {
                path: entry.path.display().to_string(),
                source: err,
            }
        })?;

        let stats = generate_delta(&mut writer, &source, &set, sess.seed)?;
        writer.flush()?;
        logger.info(
            2,
            format!(
                "sent {}: {} literal, {} matched",
                entry.wpath, stats.literal, stats.matched
            ),
        );
    }

    writer.write_int(-1)?;
    let stats = SessionStats {
        bytes_read: reader.bytes_read(),
        bytes_written: writer.get_ref().bytes_written(),
        total_size: list.total_size(),
    };
    stats.send(&mut writer)?;
    writer.flush()?;
    logger.info(
        1,
        format!(
            "sent {} bytes  received {} bytes  total size {}",
            stats.bytes_written, stats.bytes_read, stats.total_size
        ),
    );
    Ok(stats)
}

/// Chooses the session seed. Zero is reserved for "unseeded", so it is
/// never produced.
fn pick_seed() -> i32 {
    loop {
        let seed: i32 = rand::random();
        if seed != 0 {
            return seed;
        }
    }
}
