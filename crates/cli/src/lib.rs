//! Command-line front end.
//!
//! Parses the option surface, works out which role this process plays
//! from the shape of its operands, spawns the peer over a secure shell
//! (or as a child of ourselves for purely local transfers), and maps
//! failures onto the documented exit codes.

mod args;
mod error;
mod fargs;
mod run;
mod transport;

pub use error::CliError;
pub use fargs::{FileArgs, Mode};
pub use run::run;

/// Successful transfer.
pub const EXIT_OK: i32 = 0;
/// Bad arguments or unsupported usage.
pub const EXIT_USAGE: i32 = 1;
/// Protocol failure or remote-side error.
pub const EXIT_PROTOCOL: i32 = 2;
/// Local I/O failure.
pub const EXIT_IO: i32 = 3;
