//! Shared harness for the end-to-end tests: run a real sender/receiver
//! pair over a socketpair, one thread per role, against scratch trees.

// Each integration test crate compiles its own copy and uses a subset.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;

use logging::Logger;
use protocol::{Options, Session, SessionStats};
use transfer::{run_receiver, run_sender, TransferError, TransferSummary};

/// Outcome of both roles of one transfer.
pub struct TransferResult {
    pub sender: Result<SessionStats, TransferError>,
    pub receiver: Result<TransferSummary, TransferError>,
}

impl TransferResult {
    pub fn expect_ok(self) -> (SessionStats, TransferSummary) {
        (
            self.sender.expect("sender role failed"),
            self.receiver.expect("receiver role failed"),
        )
    }
}

/// Runs a full transfer: `sources` into `sink` with `opts` applied to
/// both roles (the sender additionally gets its role bit).
pub fn transfer(opts: &Options, sources: &[String], sink: &Path) -> TransferResult {
    let (sender_stream, receiver_stream) = UnixStream::pair().expect("socketpair");

    let sender_opts = Options {
        sender: true,
        ..opts.clone()
    };
    let sources = sources.to_vec();
    let sender_thread = thread::spawn(move || {
        let mut sess = Session::new(sender_opts, Logger::with_sink(0, Vec::new()));
        let reader = sender_stream.try_clone().expect("clone stream");
        run_sender(&mut sess, reader, sender_stream, &sources)
    });

    let mut sess = Session::new(opts.clone(), Logger::with_sink(0, Vec::new()));
    let reader = receiver_stream.try_clone().expect("clone stream");
    let receiver = run_receiver(&mut sess, reader, receiver_stream, sink);
    let sender = sender_thread.join().expect("sender thread");

    TransferResult { sender, receiver }
}

/// Convenience: recursive transfer of `src`'s contents into `sink`.
pub fn transfer_tree(opts: &Options, src: &Path, sink: &Path) -> TransferResult {
    let mut opts = opts.clone();
    opts.recursive = true;
    transfer(&opts, &[format!("{}/", src.display())], sink)
}

/// Writes a tree described as relative-path/content pairs.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parents");
        }
        fs::write(&path, contents).expect("write file");
    }
}

/// Reads every regular file under `root` as relative-path/content pairs.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut found = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for child in fs::read_dir(&dir).expect("read dir") {
            let child = child.expect("dir entry");
            let path = child.path();
            let kind = child.file_type().expect("file type");
            if kind.is_dir() {
                stack.push(path);
            } else if kind.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .into_owned();
                found.insert(rel, fs::read(&path).expect("read file"));
            }
        }
    }
    found
}

/// Deterministic pseudo-random payload so tests never depend on an RNG.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}
