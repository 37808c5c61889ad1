use std::ffi::OsString;
use std::io;
use std::path::Path;

use logging::Logger;
use protocol::Session;
use transfer::{run_receiver, run_sender};

use crate::args::{self, ParsedArgs};
use crate::error::CliError;
use crate::fargs::{parse_operands, peer_command_line, Mode};
use crate::transport::{self, PeerProcess};
use crate::{EXIT_OK, EXIT_USAGE};

/// Parses the command line, runs the transfer, and returns the process
/// exit code.
pub fn run<I, S>(arguments: I) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let parsed = match args::parse(arguments) {
        Ok(parsed) => parsed,
        Err(err) => {
            let wanted = matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            );
            let _ = err.print();
            return if wanted { EXIT_OK } else { EXIT_USAGE };
        }
    };

    let logger = Logger::stderr(parsed.opts.verbose);
    match dispatch(parsed, &logger) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            logger.error(err.to_string());
            err.exit_code()
        }
    }
}

fn dispatch(parsed: ParsedArgs, logger: &Logger) -> Result<(), CliError> {
    if parsed.opts.server {
        run_server(parsed, logger)
    } else {
        run_client(parsed, logger)
    }
}

/// The spawned end of a transfer: speak the protocol over stdin/stdout.
fn run_server(parsed: ParsedArgs, logger: &Logger) -> Result<(), CliError> {
    let ParsedArgs { opts, mut operands } = parsed;
    // The client terminates the option list with a lone dot.
    if operands.first().map(String::as_str) == Some(".") {
        operands.remove(0);
    }
    if operands.is_empty() {
        return Err(CliError::Usage("server invoked without paths".to_owned()));
    }

    let mut sess = Session::new(opts.clone(), logger.clone());
    if opts.sender {
        run_sender(&mut sess, io::stdin(), io::stdout(), &operands)?;
    } else {
        let sink = operands[0].clone();
        run_receiver(&mut sess, io::stdin(), io::stdout(), Path::new(&sink))?;
    }
    Ok(())
}

/// The invoking end: analyze operands, spawn the peer, run our role.
fn run_client(parsed: ParsedArgs, logger: &Logger) -> Result<(), CliError> {
    let ParsedArgs { opts, operands } = parsed;
    let fargs = parse_operands(&operands)?;
    if fargs.remote {
        return Err(CliError::DaemonUnsupported);
    }

    let argv = peer_command_line(&opts, &fargs);
    logger.info(2, format!("spawning peer: {}", argv.join(" ")));
    let peer = match &fargs.host {
        Some(host) => transport::spawn_remote(host, &argv),
        None => transport::spawn_local(&argv),
    }
    .map_err(CliError::Spawn)?;
    let PeerProcess {
        mut child,
        reader,
        writer,
    } = peer;

    let mut sess = Session::new(opts.clone(), logger.clone());
    let result = match fargs.mode {
        Mode::Sender => run_sender(&mut sess, reader, writer, &fargs.sources).map(drop),
        Mode::Receiver | Mode::Local => {
            run_receiver(&mut sess, reader, writer, Path::new(&fargs.sink)).map(drop)
        }
    };

    let status = child.wait().map_err(CliError::Spawn)?;
    result?;
    if !status.success() {
        return Err(CliError::PeerFailed(status.code().unwrap_or(-1)));
    }
    Ok(())
}
