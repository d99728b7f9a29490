use std::fs;
use std::path::PathBuf;
use v4front::container::{load_bytecode, save_bytecode, V4B_HEADER_LEN, V4B_MAGIC};
use v4front::{compile, Op};

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("v4front_{}_{}", std::process::id(), name));
    path
}

#[test]
fn test_save_load_round_trip() {
    let program = compile("10 20 + DUP *").unwrap();
    let path = temp_path("roundtrip.v4b");

    save_bytecode(&path, &program.main).unwrap();
    let loaded = load_bytecode(&path).unwrap();
    assert_eq!(loaded, program.main);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_header_layout() {
    let path = temp_path("header.v4b");
    let code = [Op::Lit as u8, 0x2A, 0, 0, 0, Op::Ret as u8];

    save_bytecode(&path, &code).unwrap();
    let raw = fs::read(&path).unwrap();

    assert_eq!(raw.len(), V4B_HEADER_LEN + code.len());
    assert_eq!(&raw[0..4], &V4B_MAGIC);
    assert_eq!(raw[4], 0); // version major
    assert_eq!(raw[5], 1); // version minor
    assert_eq!(&raw[6..8], &[0, 0]); // flags
    assert_eq!(
        u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        code.len() as u32
    );
    assert_eq!(&raw[12..16], &[0, 0, 0, 0]); // reserved
    assert_eq!(&raw[16..], &code);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_save_rejects_empty_buffer() {
    let path = temp_path("empty.v4b");
    assert!(save_bytecode(&path, &[]).is_err());
    assert!(!path.exists());
}

#[test]
fn test_load_rejects_bad_magic() {
    let path = temp_path("badmagic.v4b");
    fs::write(&path, b"NOPE0000000000000000").unwrap();

    let err = load_bytecode(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_load_rejects_short_file() {
    let path = temp_path("short.v4b");
    fs::write(&path, b"V4BC").unwrap();

    assert!(load_bytecode(&path).is_err());

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_load_rejects_truncated_code() {
    let path = temp_path("truncated.v4b");
    let code = [Op::Ret as u8; 10];
    save_bytecode(&path, &code).unwrap();

    // Chop two bytes off the end.
    let mut raw = fs::read(&path).unwrap();
    raw.truncate(raw.len() - 2);
    fs::write(&path, &raw).unwrap();

    assert!(load_bytecode(&path).is_err());

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_load_missing_file() {
    assert!(load_bytecode(temp_path("does_not_exist.v4b")).is_err());
}
