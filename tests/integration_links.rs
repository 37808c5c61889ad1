//! Symlink handling across a live transfer.

mod common;

use std::fs;
use std::os::unix::fs::symlink;

use common::{transfer_tree, write_tree};
use protocol::Options;

#[test]
fn symlinks_arrive_as_symlinks_with_preserve_links() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("target", b"pointed at")]);
    symlink("../target", src.path().join("link")).unwrap();

    let opts = Options {
        preserve_links: true,
        ..Options::default()
    };
    let (_, summary) = transfer_tree(&opts, src.path(), dst.path()).expect_ok();
    assert_eq!(summary.file_errors, 0);

    let link = dst.path().join("link");
    let meta = fs::symlink_metadata(&link).unwrap();
    assert!(meta.file_type().is_symlink(), "link must stay a symlink");
    assert_eq!(fs::read_link(&link).unwrap().to_string_lossy(), "../target");
}

#[test]
fn symlinks_are_skipped_without_preserve_links() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("file", b"plain")]);
    symlink("file", src.path().join("link")).unwrap();

    transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    assert!(dst.path().join("file").exists());
    assert!(fs::symlink_metadata(dst.path().join("link")).is_err());
}

#[test]
fn existing_file_is_replaced_by_a_symlink() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    symlink("elsewhere", src.path().join("entry")).unwrap();
    write_tree(dst.path(), &[("entry", b"used to be a file")]);

    let opts = Options {
        preserve_links: true,
        ..Options::default()
    };
    transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    let meta = fs::symlink_metadata(dst.path().join("entry")).unwrap();
    assert!(meta.file_type().is_symlink());
}
