//! The deletion pass over a live transfer.

mod common;

use common::{transfer_tree, write_tree};
use protocol::Options;

#[test]
fn extraneous_receiver_files_are_removed() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("keep", b"k")]);
    write_tree(dst.path(), &[("keep", b"k"), ("x", b"extra")]);

    let opts = Options {
        del: true,
        ..Options::default()
    };
    let (_, summary) = transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    assert!(dst.path().join("keep").exists());
    assert!(!dst.path().join("x").exists());
    assert_eq!(summary.deleted, 1);
}

#[test]
fn extraneous_directories_are_removed_depth_first() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("keep", b"k")]);
    write_tree(dst.path(), &[("old/deep/file", b"gone")]);

    let opts = Options {
        del: true,
        ..Options::default()
    };
    let (_, summary) = transfer_tree(&opts, src.path(), dst.path()).expect_ok();

    assert!(!dst.path().join("old").exists());
    assert_eq!(summary.deleted, 3);
}

#[test]
fn delete_without_the_flag_leaves_extras_alone() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("keep", b"k")]);
    write_tree(dst.path(), &[("x", b"still here")]);

    transfer_tree(&Options::default(), src.path(), dst.path()).expect_ok();

    assert!(dst.path().join("x").exists());
}

#[test]
fn delete_needs_recursion() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a", b"a")]);
    write_tree(dst.path(), &[("x", b"extra")]);

    // Non-recursive transfer of a named file: --delete must not engage.
    let opts = Options {
        del: true,
        ..Options::default()
    };
    let sources = vec![src.path().join("a").display().to_string()];
    let result = common::transfer(&opts, &sources, dst.path());
    let (_, summary) = result.expect_ok();

    assert_eq!(summary.deleted, 0);
    assert!(dst.path().join("x").exists());
}
