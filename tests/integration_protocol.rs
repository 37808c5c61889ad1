//! Handshake failure modes against a misbehaving peer.

mod common;

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;

use logging::Logger;
use protocol::{Options, ProtocolError, Session, WireWrite};
use transfer::{run_receiver, run_sender, TransferError};

#[test]
fn receiver_refuses_an_old_peer() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    let peer = thread::spawn(move || {
        let mut theirs = theirs;
        theirs.write_int(26).unwrap();
        theirs.flush().unwrap();
        // Keep the stream open until the other side decides.
        theirs
    });

    let dst = tempfile::tempdir().unwrap();
    let mut sess = Session::new(Options::default(), Logger::with_sink(0, Vec::new()));
    let reader = ours.try_clone().unwrap();
    let result = run_receiver(&mut sess, reader, ours, dst.path());

    assert!(matches!(
        result,
        Err(TransferError::Protocol(ProtocolError::VersionTooOld {
            remote: 26,
            ..
        }))
    ));
    drop(peer.join().unwrap());
}

#[test]
fn sender_refuses_an_old_peer() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    let peer = thread::spawn(move || {
        let mut theirs = theirs;
        theirs.write_int(20).unwrap();
        theirs.flush().unwrap();
        theirs
    });

    let mut sess = Session::new(
        Options {
            sender: true,
            ..Options::default()
        },
        Logger::with_sink(0, Vec::new()),
    );
    let reader = ours.try_clone().unwrap();
    let result = run_sender(&mut sess, reader, ours, &["/tmp".to_owned()]);

    assert!(matches!(
        result,
        Err(TransferError::Protocol(ProtocolError::VersionTooOld { .. }))
    ));
    drop(peer.join().unwrap());
}

#[test]
fn receiver_dies_cleanly_on_a_vanishing_peer() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    drop(theirs);

    let dst = tempfile::tempdir().unwrap();
    let mut sess = Session::new(Options::default(), Logger::with_sink(0, Vec::new()));
    let reader = ours.try_clone().unwrap();
    let result = run_receiver(&mut sess, reader, ours, dst.path());

    assert!(result.is_err());
    assert!(!Path::new(&dst.path().join(".anything")).exists());
}

#[test]
fn seed_reaches_the_receiver_session() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    common::write_tree(src.path(), &[("a", b"seeded")]);

    let (sender_stream, receiver_stream) = UnixStream::pair().unwrap();
    let sources = vec![format!("{}/", src.path().display())];
    let sender = thread::spawn(move || {
        let mut sess = Session::new(
            Options {
                sender: true,
                recursive: true,
                ..Options::default()
            },
            Logger::with_sink(0, Vec::new()),
        );
        let reader = sender_stream.try_clone().unwrap();
        run_sender(&mut sess, reader, sender_stream, &sources).map(|_| sess.seed)
    });

    let mut sess = Session::new(
        Options {
            recursive: true,
            ..Options::default()
        },
        Logger::with_sink(0, Vec::new()),
    );
    let reader = receiver_stream.try_clone().unwrap();
    run_receiver(&mut sess, reader, receiver_stream, dst.path()).unwrap();
    let sender_seed = sender.join().unwrap().unwrap();

    assert_eq!(sess.seed, sender_seed);
    assert_ne!(sess.seed, 0);
}
