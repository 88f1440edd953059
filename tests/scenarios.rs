//! End-to-end scenarios against the public API at full scale.
//!
//! These run at full scale (1,000,000 keys) rather than shrinking for CI:
//! the shuffle engine's worst-case behavior only shows up near declared
//! capacity.

use keon::Table;
use std::time::Instant;
use tempfile::tempdir;

fn key(i: u64) -> [u8; 8] {
    [
        (i % 255) as u8,
        (i % 26) as u8,
        (i % 235) as u8,
        (i % 254) as u8,
        (i % 249) as u8,
        (i % 197) as u8,
        (i % 17) as u8,
        (i % 99) as u8,
    ]
}

const SCALE: u64 = 1_000_000;

fn build_full_table() -> Table {
    let mut t = Table::new(SCALE);
    let start = Instant::now();
    for i in 0..SCALE {
        let out = t.insert(&key(i));
        assert!(out.ok, "insert {i} failed: {out:?}");
    }
    println!("inserted {SCALE} keys in {:?}", start.elapsed());
    t
}

#[test]
fn fills_to_declared_capacity_with_one_million_keys() {
    let t = build_full_table();
    assert_eq!(t.len(), t.cap());
    for i in 0..SCALE {
        assert!(t.lookup(&key(i)), "missing key {i}");
    }
}

#[test]
fn unknown_key_is_absent_at_full_capacity() {
    let t = build_full_table();
    assert!(!t.lookup(&[0xFFu8; 8]));
}

#[test]
fn one_more_insert_after_full_is_no_space() {
    let mut t = build_full_table();
    let len_before = t.len();
    let out = t.insert(&key(SCALE + 1));
    assert!(out.no_space);
    assert_eq!(t.len(), len_before);
}

#[test]
fn round_trips_a_million_keys_through_a_keon_file() {
    let mut t = build_full_table();
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.keon");

    t.write(&path).unwrap();
    let (loaded, ok) = Table::load(&path).unwrap();
    assert!(ok);
    for i in 0..SCALE {
        assert!(loaded.lookup(&key(i)));
    }

    let meta = Table::info(&path).unwrap();
    assert!(meta.ok);
}

#[test]
fn small_table_insert_exist_remove_reinsert() {
    let mut t = Table::new(10);
    for i in 0..10u64 {
        assert!(t.insert(&key(i)).ok);
    }
    assert!(t.insert(&key(0)).exist);
    assert!(t.remove(&key(3)));
    assert!(t.insert(&key(3)).ok);
    assert_eq!(t.len(), 10);
}

#[test]
fn corrupted_payload_fails_integrity_check() {
    let mut t = Table::new(1000);
    for i in 0..500u64 {
        t.insert(&key(i));
    }
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.keon");
    t.write(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let header_len = bytes.iter().position(|&b| b == b'\n').unwrap() + 1;
    let flip_at = bytes[header_len..]
        .iter()
        .position(|&b| b != 0)
        .map(|i| header_len + i)
        .unwrap();
    bytes[flip_at] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();

    let (_loaded, ok) = Table::load(&path).unwrap();
    assert!(!ok);
}
