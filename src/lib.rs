//! keon — a compact cuckoo-placement membership set.
//!
//! Stores up to a declared maximum number of 64-bit-hashed byte-string
//! keys in a flat `u64` slot array (eight bytes per key, plus a small
//! density overhead), and answers membership queries in at most nine slot
//! reads. Insertion uses a three-wide cuckoo placement engine: a key is
//! written to the first empty slot among three candidate rows, and if all
//! nine are occupied, a randomized eviction ("shuffle") loop displaces
//! existing keys to their alternate candidate rows until room opens up or
//! the table gives up.
//!
//! # ABI
//!
//! - Keys are hashed with [`seahash`] ([`hash::key_hash`]) — two
//!   implementations must agree on this to share a snapshot file.
//! - Candidate rows: `width = 3` slots per row;
//!   `row0 = h % depth`, `row1 = (h ^ 0x9E3779B97F4A7C15) % depth`,
//!   `row2 = (h ^ 0x85EBCA6B4D3F79A3) % depth`.
//! - `0` is the empty-slot sentinel — a key whose hash is exactly zero
//!   cannot be stored (undetectable, and not guarded against).
//! - Snapshot files (`.keon`): an ASCII header
//!   `"<checksum> <count> <max> <depth>\n"` followed by `depth * width`
//!   little-endian `u64` slots, checksummed by XOR-folding every slot.
//!
//! # Concurrency
//!
//! No locking inside this crate — see [`table`] for the
//! Multiple-Reader-Single-Writer contract callers must uphold themselves.

pub mod density;
pub mod hash;
pub mod rng;
pub mod snapshot;
pub mod table;

pub use snapshot::SnapshotInfo;
pub use table::{InsertOutcome, Table};

/// A `Table` shared across threads under the MRSW contract: take `read()`
/// for `lookup`/`dump`/`len`/`cap`/`ratio`/`info`, `write()` for
/// `insert`/`remove`/`write`/`save`.
pub type SharedTable = parking_lot::RwLock<Table>;

#[cfg(test)]
mod tests {
    use super::*;

    // A small end-to-end pass through the public API, independent of any
    // one module's internal tests.
    #[test]
    fn public_api_smoke_test() {
        let mut t = Table::new(10);
        for i in 0..10u8 {
            assert!(t.insert(&[i; 8]).ok);
        }
        assert_eq!(t.len(), t.cap());
        assert!(t.insert(&[0u8; 8]).exist);
        assert!(t.remove(&[0u8; 8]));
        assert!(t.insert(&[0u8; 8]).ok);
        assert_eq!(t.len(), 10);
        assert!(!t.lookup(&[0xFFu8; 8]));
    }

    #[test]
    fn shared_table_under_rwlock() {
        let shared = SharedTable::new(Table::new(10));
        shared.write().insert(b"a");
        assert!(shared.read().lookup(b"a"));
        assert_eq!(shared.read().len(), 1);
    }
}
