use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn vi_binder(dir: &Path, args: &[&str]) -> Output {
    let rc = dir.join("test.rc");
    if !rc.exists() {
        fs::write(&rc, "set ts=8\n").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_vi-binder"))
        .current_dir(dir)
        .arg("--rc")
        .arg(&rc)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_keys_then_write_quit() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, "one\ntwo\nthree\n").unwrap();

    let out = vi_binder(dir.path(), &[file.to_str().unwrap(), "-k", "jdd", "-c", "wq"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "one\nthree\n");
}

#[test]
fn test_print_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "foo foo\nbar\n").unwrap();

    let out = vi_binder(dir.path(), &[file.to_str().unwrap(), "-c", "%s/foo/x/g", "--print"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "x x\nbar\n");
    assert_eq!(fs::read_to_string(&file).unwrap(), "foo foo\nbar\n");
}

#[test]
fn test_quit_stops_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("b.txt");
    fs::write(&file, "keep\n").unwrap();

    let out = vi_binder(dir.path(), &[file.to_str().unwrap(), "-c", "q!", "-c", "d", "-c", "w"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "keep\n");
}

#[test]
fn test_missing_file_is_created_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("new.txt");

    let out = vi_binder(dir.path(), &[file.to_str().unwrap(), "-k", "ihello<Esc>", "-c", "x"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "hello");
}

#[test]
fn test_errors_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("c.txt");
    fs::write(&file, "text").unwrap();

    let out = vi_binder(dir.path(), &[file.to_str().unwrap(), "-c", "bogus", "--print"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "text");
    assert!(String::from_utf8_lossy(&out.stderr).contains("Not an editor command: bogus"));
}
