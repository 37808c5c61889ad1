//! The two role drivers that run one end-to-end synchronization.
//!
//! A transfer is a conversation between exactly two roles over a duplex
//! byte stream: the sender owns the authoritative tree and the token
//! streams, the receiver owns the sink tree and every filesystem
//! mutation. Each driver is single-threaded and blocking; the state
//! machines in the two loops impose all cross-direction ordering.

mod error;
mod mkpath;
mod receiver;
mod sender;
mod temp;

pub use error::TransferError;
pub use mkpath::mkpath;
pub use receiver::{run_receiver, TransferSummary};
pub use sender::run_sender;
pub use temp::TempGuard;
