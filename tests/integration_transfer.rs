//! End-to-end transfers between a live sender/receiver pair.

mod common;

use common::{payload, read_tree, transfer, transfer_tree, write_tree};
use protocol::Options;

#[test]
fn fresh_receiver_gets_the_whole_tree() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a", b"hello\n"), ("b/c", b"world\n")]);

    let (stats, summary) = transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    assert_eq!(read_tree(dst.path()), read_tree(src.path()));
    assert_eq!(stats.total_size, 12);
    assert_eq!(summary.literal_bytes, 12);
    assert_eq!(summary.matched_bytes, 0);
    assert_eq!(summary.files_updated, 2);
    assert_eq!(summary.file_errors, 0);
}

#[test]
fn identical_trees_move_no_literals_and_rename_nothing() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let contents = b"0123456789".repeat(1000);
    write_tree(src.path(), &[("a", contents.as_slice())]);
    write_tree(dst.path(), &[("a", contents.as_slice())]);

    let (_, summary) = transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    assert_eq!(summary.literal_bytes, 0);
    assert_eq!(summary.matched_bytes, contents.len() as u64);
    assert_eq!(summary.files_updated, 0, "identical file must not be replaced");
}

#[test]
fn changed_prefix_reuses_the_aligned_tail() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let body = payload(1 << 20, 42);

    let mut old = b"AAAA".to_vec();
    old.extend_from_slice(&body);
    let mut new = b"BBBB".to_vec();
    new.extend_from_slice(&body);
    write_tree(src.path(), &[("a", new.as_slice())]);
    write_tree(dst.path(), &[("a", old.as_slice())]);

    let (_, summary) = transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    assert_eq!(read_tree(dst.path()).get("a"), Some(&new));
    // Equal-length prefixes keep the block grid aligned: only the first
    // block (which contains the changed bytes) travels literal.
    assert_eq!(summary.literal_bytes, 700);
    assert_eq!(summary.matched_bytes, new.len() as u64 - 700);
}

#[test]
fn second_run_is_idempotent() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(
        src.path(),
        &[("a", payload(5000, 1).as_slice()), ("d/b", b"x")],
    );

    let opts = Options {
        preserve_times: true,
        ..Options::default()
    };
    transfer_tree(&opts, src.path(), dst.path()).expect_ok();
    let (_, second) = transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    assert_eq!(second.literal_bytes, 0);
    assert_eq!(second.files_updated, 0);
    assert_eq!(read_tree(dst.path()), read_tree(src.path()));
}

#[test]
fn boundary_sizes_survive_a_full_transfer() {
    let block = 700usize;
    for size in [0, 1, block - 1, block, block + 1, 3 * block, 3 * block + 299] {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let contents = payload(size, size as u64 + 7);
        write_tree(src.path(), &[("f", contents.as_slice())]);
        // A shifted basis exercises both literals and matches.
        if size > 1 {
            write_tree(dst.path(), &[("f", &contents[1..])]);
        }

        let (_, summary) =
            transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();
        assert_eq!(
            read_tree(dst.path()).get("f"),
            Some(&contents),
            "size {size}"
        );
        assert_eq!(summary.file_errors, 0, "size {size}");
    }
}

#[test]
fn non_recursive_transfers_named_files() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("one.txt", b"1"), ("two.txt", b"2")]);

    let sources = vec![
        src.path().join("one.txt").display().to_string(),
        src.path().join("two.txt").display().to_string(),
    ];
    let (stats, summary) = transfer(&Options::default(), &sources, dst.path()).expect_ok();

    let tree = read_tree(dst.path());
    assert_eq!(tree.get("one.txt").map(Vec::as_slice), Some(b"1".as_slice()));
    assert_eq!(tree.get("two.txt").map(Vec::as_slice), Some(b"2".as_slice()));
    assert_eq!(stats.total_size, 2);
    assert_eq!(summary.files_updated, 2);
}

#[test]
fn preserve_times_carries_mtimes() {
    use std::os::unix::fs::MetadataExt;

    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a", b"timed")]);

    let opts = Options {
        preserve_times: true,
        ..Options::default()
    };
    transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    let want = std::fs::metadata(src.path().join("a")).unwrap().mtime();
    let got = std::fs::metadata(dst.path().join("a")).unwrap().mtime();
    assert_eq!(got, want);
}

#[test]
fn preserve_perms_carries_permissions() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a", b"locked down")]);
    fs::set_permissions(src.path().join("a"), fs::Permissions::from_mode(0o640)).unwrap();

    let opts = Options {
        preserve_perms: true,
        ..Options::default()
    };
    transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    let mode = fs::metadata(dst.path().join("a")).unwrap().permissions().mode();
    assert_eq!(mode & 0o7777, 0o640);
}

#[test]
fn sender_and_receiver_agree_on_wire_counts() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a", payload(10_000, 3).as_slice())]);

    let (stats, summary) = transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    // The receiver wrote its last byte before the sender snapshotted its
    // counters, so that direction agrees exactly; the other direction
    // additionally carries the stats frame itself.
    assert_eq!(stats.bytes_read, summary.bytes_written);
    assert!(summary.bytes_read > stats.bytes_written);
    assert!(summary.bytes_read - stats.bytes_written < 64);
}
