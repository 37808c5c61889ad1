use std::io;

use thiserror::Error;
use transfer::TransferError;

use crate::{EXIT_IO, EXIT_PROTOCOL, EXIT_USAGE};

/// Failures surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Operands do not describe a runnable transfer.
    #[error("{0}")]
    Usage(String),

    /// `rsync://` and `host::module` operands need a daemon on the other
    /// side, which this client does not speak.
    #[error("daemon connections are not supported")]
    DaemonUnsupported,

    /// The transfer itself failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The peer process could not be spawned.
    #[error("failed to spawn peer: {0}")]
    Spawn(io::Error),

    /// The peer process reported failure after a clean local run.
    #[error("peer exited with status {0}")]
    PeerFailed(i32),
}

impl CliError {
    /// Maps the failure onto the documented exit codes.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::DaemonUnsupported => EXIT_USAGE,
            Self::Transfer(err) => {
                if err.is_protocol() {
                    EXIT_PROTOCOL
                } else {
                    EXIT_IO
                }
            }
            Self::Spawn(_) => EXIT_IO,
            Self::PeerFailed(_) => EXIT_PROTOCOL,
        }
    }
}
