use logging::Logger;

use crate::codec::{WireRead, WireWrite};
use crate::error::ProtocolError;
use crate::PROTOCOL_VERSION;

/// Flat record of the options the synchronization core recognizes.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Acting as the sending side of the transfer.
    pub sender: bool,
    /// Spawned as the remote end of a transfer.
    pub server: bool,
    /// Descend into directories named as sources.
    pub recursive: bool,
    /// Verbosity level, 0–4.
    pub verbose: u8,
    /// Consume the wire but leave the filesystem untouched.
    pub dry_run: bool,
    /// Carry modification times onto received files.
    pub preserve_times: bool,
    /// Carry permission bits onto received files.
    pub preserve_perms: bool,
    /// Represent symlinks as symlinks instead of skipping them.
    pub preserve_links: bool,
    /// Remove sink entries absent from the sender's list.
    pub del: bool,
    /// Override for the peer executable spawned by the transport.
    pub rsync_path: Option<String>,
}

/// State shared by every component for the duration of one transfer.
///
/// Mirrors the lifetime of the connection: constructed after the options
/// are known, seeded during the handshake, dropped when the stream closes.
/// The multiplex flags live on the stream adapters themselves; the session
/// records the negotiated facts both roles consult.
#[derive(Clone, Debug)]
pub struct Session {
    /// Options in force for this transfer.
    pub opts: Options,
    /// Seed mixed into every strong digest, chosen by the sender.
    pub seed: i32,
    /// Protocol version spoken locally.
    pub lver: i32,
    /// Protocol version announced by the peer.
    pub rver: i32,
    /// Diagnostics sink, verbosity-gated.
    pub logger: Logger,
}

impl Session {
    /// Creates a session for the given options; versions and seed are
    /// filled in by the handshake.
    #[must_use]
    pub fn new(opts: Options, logger: Logger) -> Self {
        Self {
            opts,
            seed: 0,
            lver: PROTOCOL_VERSION,
            rver: 0,
            logger,
        }
    }
}

/// Runs the version half of the handshake.
///
/// Both peers write their own version before reading the peer's, so the
/// exchange cannot deadlock. A remote version older than
/// [`PROTOCOL_VERSION`] is refused.
pub fn exchange_versions<R, W>(reader: &mut R, writer: &mut W) -> Result<i32, ProtocolError>
where
    R: WireRead,
    W: WireWrite,
{
    writer.write_int(PROTOCOL_VERSION)?;
    writer.flush()?;
    let rver = reader.read_int()?;
    if rver < PROTOCOL_VERSION {
        return Err(ProtocolError::VersionTooOld {
            remote: rver,
            local: PROTOCOL_VERSION,
        });
    }
    Ok(rver)
}
