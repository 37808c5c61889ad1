use std::env;
use std::io;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// A spawned peer with its duplex stream halves.
///
/// The role driver consumes `reader` and `writer`; dropping the writer
/// closes the peer's stdin, which is how it learns the conversation is
/// over if the protocol did not already end it.
#[derive(Debug)]
pub(crate) struct PeerProcess {
    pub child: Child,
    pub reader: ChildStdout,
    pub writer: ChildStdin,
}

/// Spawns the peer on `host` over a secure shell.
///
/// `argv` is the full remote command line, program name first, exactly as
/// composed by [`crate::fargs::peer_command_line`].
pub(crate) fn spawn_remote(host: &str, argv: &[String]) -> io::Result<PeerProcess> {
    let mut command = Command::new("ssh");
    command.arg(host).args(argv);
    spawn(command)
}

/// Spawns this same binary as the local peer for a local-to-local
/// transfer; `argv[0]` is discarded in favor of the running executable.
pub(crate) fn spawn_local(argv: &[String]) -> io::Result<PeerProcess> {
    let exe = env::current_exe()?;
    let mut command = Command::new(exe);
    command.args(&argv[1..]);
    spawn(command)
}

fn spawn(mut command: Command) -> io::Result<PeerProcess> {
    command.stdin(Stdio::piped()).stdout(Stdio::piped());
    let mut child = command.spawn()?;
    let writer = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "peer stdin not piped"))?;
    let reader = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "peer stdout not piped"))?;
    Ok(PeerProcess {
        child,
        reader,
        writer,
    })
}
