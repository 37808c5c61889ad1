use protocol::Options;

use crate::error::CliError;

/// Which role this process plays, derived from where the remote operand
/// sits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Both ends are local paths; we still run a real sender/receiver
    /// pair, one of them as a child process.
    Local,
    /// The sink is remote: this process sends.
    Sender,
    /// A source is remote: this process receives.
    Receiver,
}

/// Analyzed command-line operands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileArgs {
    /// Remote host, if any operand named one.
    pub host: Option<String>,
    /// Source operands with any host prefix stripped.
    pub sources: Vec<String>,
    /// Sink operand with any host prefix stripped.
    pub sink: String,
    /// This process's role.
    pub mode: Mode,
    /// `true` for `rsync://` or `host::module` syntax.
    pub remote: bool,
    /// Module name for daemon-style operands.
    pub module: Option<String>,
}

/// One operand picked apart.
#[derive(Debug, Eq, PartialEq)]
struct Operand {
    host: Option<String>,
    module: Option<String>,
    daemon: bool,
    path: String,
}

/// Splits `host:path`, `host::module/path` and `rsync://host/module/path`
/// operands. A colon that appears after a slash is part of a local path.
fn split_operand(operand: &str) -> Operand {
    if let Some(rest) = operand.strip_prefix("rsync://") {
        let (host, tail) = rest.split_once('/').unwrap_or((rest, ""));
        let (module, path) = tail.split_once('/').unwrap_or((tail, ""));
        return Operand {
            host: Some(host.to_owned()),
            module: (!module.is_empty()).then(|| module.to_owned()),
            daemon: true,
            path: path.to_owned(),
        };
    }
    if let Some((host, rest)) = operand.split_once(':') {
        if !host.contains('/') && !host.is_empty() {
            if let Some(rest) = rest.strip_prefix(':') {
                let (module, path) = rest.split_once('/').unwrap_or((rest, ""));
                return Operand {
                    host: Some(host.to_owned()),
                    module: (!module.is_empty()).then(|| module.to_owned()),
                    daemon: true,
                    path: path.to_owned(),
                };
            }
            return Operand {
                host: Some(host.to_owned()),
                module: None,
                daemon: false,
                path: rest.to_owned(),
            };
        }
    }
    Operand {
        host: None,
        module: None,
        daemon: false,
        path: operand.to_owned(),
    }
}

/// Works out the transfer shape from the positional operands.
pub fn parse_operands(operands: &[String]) -> Result<FileArgs, CliError> {
    if operands.len() < 2 {
        return Err(CliError::Usage(
            "need at least one source and a destination".to_owned(),
        ));
    }

    let (sink_operand, source_operands) = operands.split_last().expect("checked length");
    let sink = split_operand(sink_operand);
    let sources: Vec<Operand> = source_operands.iter().map(|s| split_operand(s)).collect();

    let remote_sources: Vec<&Operand> = sources.iter().filter(|o| o.host.is_some()).collect();

    if sink.host.is_some() && !remote_sources.is_empty() {
        return Err(CliError::Usage(
            "source and destination cannot both be remote".to_owned(),
        ));
    }

    if let Some(host) = sink.host {
        return Ok(FileArgs {
            host: Some(host),
            sources: sources.into_iter().map(|o| o.path).collect(),
            sink: sink.path,
            mode: Mode::Sender,
            remote: sink.daemon,
            module: sink.module,
        });
    }

    if let Some(first) = remote_sources.first() {
        if remote_sources.len() != sources.len() {
            return Err(CliError::Usage(
                "all sources must be on the same host".to_owned(),
            ));
        }
        let host = first.host.clone().expect("remote source has a host");
        let daemon = first.daemon;
        let module = first.module.clone();
        if remote_sources
            .iter()
            .any(|o| o.host.as_deref() != Some(host.as_str()) || o.daemon != daemon)
        {
            return Err(CliError::Usage(
                "all sources must be on the same host".to_owned(),
            ));
        }
        return Ok(FileArgs {
            host: Some(host),
            sources: sources.into_iter().map(|o| o.path).collect(),
            sink: sink.path,
            mode: Mode::Receiver,
            remote: daemon,
            module,
        });
    }

    Ok(FileArgs {
        host: None,
        sources: sources.into_iter().map(|o| o.path).collect(),
        sink: sink.path,
        mode: Mode::Local,
        remote: false,
        module: None,
    })
}

/// Composes the argument vector for the peer process.
///
/// The peer is always invoked as `--server`, with `--sender` when the
/// remote side is the one reading its local tree, the forwarded option
/// flags, a lone `.` marking the end of options, and finally the paths
/// the peer operates on.
#[must_use]
pub fn peer_command_line(opts: &Options, fargs: &FileArgs) -> Vec<String> {
    let mut argv = vec![
        opts.rsync_path.clone().unwrap_or_else(|| "oxsync".to_owned()),
        "--server".to_owned(),
    ];
    // The peer's role mirrors ours.
    if fargs.mode != Mode::Sender {
        argv.push("--sender".to_owned());
    }

    let mut flags = String::from("-");
    for _ in 0..opts.verbose {
        flags.push('v');
    }
    if opts.recursive {
        flags.push('r');
    }
    if opts.preserve_links {
        flags.push('l');
    }
    if opts.preserve_times {
        flags.push('t');
    }
    if opts.preserve_perms {
        flags.push('p');
    }
    if opts.dry_run {
        flags.push('n');
    }
    if flags.len() > 1 {
        argv.push(flags);
    }
    if opts.del {
        argv.push("--delete".to_owned());
    }

    argv.push(".".to_owned());
    match fargs.mode {
        Mode::Sender => argv.push(fargs.sink.clone()),
        _ => argv.extend(fargs.sources.iter().cloned()),
    }
    argv
}
