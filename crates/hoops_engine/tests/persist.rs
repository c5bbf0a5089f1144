use std::fs;

use hoops_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn rewrite_replaces_existing_lines() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_lines("seasons.jsonl", ["a", "b"]).unwrap();
    assert_eq!(first.file_name().unwrap(), "seasons.jsonl");
    assert_eq!(fs::read_to_string(&first).unwrap(), "a\nb\n");

    let second = writer.write_lines("seasons.jsonl", ["c"]).unwrap();
    assert_eq!(first, second);
    assert_eq!(writer.read_lines("seasons.jsonl").unwrap(), vec!["c"]);
}

#[test]
fn missing_file_reads_as_empty() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("never-written"));
    assert!(writer.read_lines("boxscores.jsonl").unwrap().is_empty());
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write_lines("schedules.jsonl", ["data"]);
    assert!(result.is_err());
    assert!(!file_path.with_file_name("schedules.jsonl").exists());
}
