//! The three-wide cuckoo placement engine.
//!
//! This is the core: a flat `Vec<u64>` slot array addressed by three
//! candidate rows per key-hash, with insertion falling back to a
//! randomized eviction ("shuffle") loop when every candidate slot is
//! occupied. See the crate-level docs for the on-disk format; this module
//! only concerns the in-memory structure and its mutation.
//!
//! # Thread safety
//!
//! `Table` has no internal locking — it is Multiple-Reader-Single-Writer
//! by contract, not by construction. Read-only operations
//! (`lookup`/`dump`/`len`/`cap`/`ratio`) take `&self`; mutating operations
//! (`insert`/`remove`) take `&mut self`, so the ordinary borrow checker
//! already refuses to let a write alias a read within one thread. A
//! caller that shares a `Table` across threads should wrap it in
//! `parking_lot::RwLock<Table>`: call the `&self` methods under `read()`
//! and the `&mut self` methods under `write()`.

use std::path::PathBuf;

use crate::density;
use crate::hash::key_hash;
use crate::rng::ShuffleRng;

/// Slots per candidate row. Fixed by the file-format ABI — changing it
/// breaks snapshot compatibility.
pub const WIDTH: u64 = 3;

/// XOR constant selecting candidate row 1. Fixed by the file-format ABI.
const ROW1_XOR: u64 = 0x9E3779B97F4A7C15;
/// XOR constant selecting candidate row 2. Fixed by the file-format ABI.
const ROW2_XOR: u64 = 0x85EBCA6B4D3F79A3;

/// Outer shuffle tracks attempted before giving up on an insert.
const SHUFFLE_CYCLES: u32 = 500;
/// Cyclic-map size bound within a single shuffle track.
const SHUFFLE_HISTORY: usize = 50;

/// Outcome of [`Table::insert`]. Exactly one field is `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The key was not present and is now stored.
    pub ok: bool,
    /// The key (or a colliding hash) was already present.
    pub exist: bool,
    /// The table could not make room for the key.
    pub no_space: bool,
}

impl InsertOutcome {
    fn ok() -> Self {
        Self { ok: true, exist: false, no_space: false }
    }
    fn exist() -> Self {
        Self { ok: false, exist: true, no_space: false }
    }
    fn no_space() -> Self {
        Self { ok: false, exist: false, no_space: true }
    }
}

/// The three candidate row base offsets for a key-hash, plus the hash
/// itself. Transient — recomputed on demand, never stored.
#[derive(Clone, Copy)]
struct Indexer {
    row_base: [u64; 3],
}

impl Indexer {
    fn new(hash: u64, depth: u64) -> Self {
        let row0 = WIDTH * (hash % depth);
        let row1 = WIDTH * ((hash ^ ROW1_XOR) % depth);
        let row2 = WIDTH * ((hash ^ ROW2_XOR) % depth);
        Self { row_base: [row0, row1, row2] }
    }
}

/// A membership set of up to `max` 64-bit-hashed byte-string keys.
pub struct Table {
    max: u64,
    depth: u64,
    slots: Vec<u64>,
    count: u64,
    rng: ShuffleRng,
    /// Path of the last successful `write`/`load`, so `save()` has
    /// somewhere to write back to without the caller repeating it.
    path: Option<PathBuf>,
}

impl Table {
    /// Compute `depth` from `max` and the process-wide `Density`: start
    /// from `max / width`, pad by `depth / Density` so the shuffle engine
    /// has empty headroom to work with near capacity, then round up until
    /// `depth * width >= max` and `depth` is itself a multiple of `width`.
    pub(crate) fn depth_for(max: u64) -> u64 {
        let d = density::get().max(1);
        let mut depth = max / WIDTH;
        depth += depth / d;
        while depth * WIDTH < max || depth % WIDTH != 0 {
            depth += 1;
        }
        depth
    }

    /// Construct a table sized for up to `max` keys.
    pub fn new(max: u64) -> Self {
        let depth = Self::depth_for(max);
        Self::with_depth(max, depth)
    }

    fn with_depth(max: u64, depth: u64) -> Self {
        let slots = vec![0u64; (depth * WIDTH) as usize];
        Self { max, depth, slots, count: 0, rng: ShuffleRng::from_entropy(), path: None }
    }

    /// Reconstruct a table of the given shape with a pre-populated slot
    /// array (used by [`crate::snapshot::load`]).
    pub(crate) fn from_parts(max: u64, depth: u64, count: u64, slots: Vec<u64>) -> Self {
        Self { max, depth, slots, count, rng: ShuffleRng::from_entropy(), path: None }
    }

    pub(crate) fn depth(&self) -> u64 {
        self.depth
    }

    pub(crate) fn slots(&self) -> &[u64] {
        &self.slots
    }

    pub(crate) fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    fn indexer(&self, h: u64) -> Indexer {
        Indexer::new(h, self.depth)
    }

    /// True if `key` is a member. At most nine slot reads; no side effects.
    pub fn lookup(&self, key: &[u8]) -> bool {
        let h = key_hash(key);
        self.lookup_hash(h)
    }

    fn lookup_hash(&self, h: u64) -> bool {
        let idx = self.indexer(h);
        for &base in &idx.row_base {
            for c in 0..WIDTH {
                if self.slots[(base + c) as usize] == h {
                    return true;
                }
            }
        }
        false
    }

    /// Remove `key` if present. Returns `true` on removal.
    ///
    /// Scans all three candidate rows rather than stopping at the first
    /// match. A stored key-hash can only ever live in one candidate slot
    /// at a time, so a single match would suffice, but the full scan
    /// costs at most nine extra reads and stays correct even if that
    /// invariant is ever loosened.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let h = key_hash(key);
        let idx = self.indexer(h);
        let mut removed = false;
        for &base in &idx.row_base {
            for c in 0..WIDTH {
                let slot = (base + c) as usize;
                if self.slots[slot] == h {
                    // Shift the remainder of the row left and clear the tail.
                    let row_end = (base + WIDTH) as usize;
                    for i in slot..row_end - 1 {
                        self.slots[i] = self.slots[i + 1];
                    }
                    self.slots[row_end - 1] = 0;
                    self.count -= 1;
                    removed = true;
                }
            }
        }
        removed
    }

    /// Insert `key`. See the module docs for the shuffle engine that backs
    /// this when every direct candidate slot is occupied.
    pub fn insert(&mut self, key: &[u8]) -> InsertOutcome {
        let h = key_hash(key);

        if self.count == self.max {
            return InsertOutcome::no_space();
        }

        // Phase 1 — probe.
        let idx = self.indexer(h);
        let mut first_empty: Option<usize> = None;
        for &base in &idx.row_base {
            for c in 0..WIDTH {
                let slot = (base + c) as usize;
                let v = self.slots[slot];
                if v == h {
                    return InsertOutcome::exist();
                }
                if v == 0 && first_empty.is_none() {
                    first_empty = Some(slot);
                }
            }
        }
        if let Some(slot) = first_empty {
            self.slots[slot] = h;
            self.count += 1;
            return InsertOutcome::ok();
        }

        // Phase 2 — shuffle.
        self.shuffle_insert(h)
    }

    fn shuffle_insert(&mut self, mut h: u64) -> InsertOutcome {
        for _track in 0..SHUFFLE_CYCLES {
            // (row_base, displaced_key_hash) -> times observed, bounded to
            // SHUFFLE_HISTORY distinct entries per track.
            let mut cyclic_map: Vec<((u64, u64), u32)> = Vec::new();

            loop {
                let idx = self.indexer(h);
                let r = self.rng.next_below(3) as usize;
                let c = self.rng.next_below(WIDTH);
                let victim_row_base = idx.row_base[r];
                let victim_slot = (victim_row_base + c) as usize;

                // The drawn slot may already be empty (it need not be the
                // one Phase 1 checked). Swapping `h` with `0` would write
                // the empty sentinel into a candidate row and miscount —
                // placing directly is behaviorally the same swap, just
                // without creating a phantom zero-key to carry forward.
                if self.slots[victim_slot] == 0 {
                    self.slots[victim_slot] = h;
                    self.count += 1;
                    return InsertOutcome::ok();
                }

                let cyclic_key = (victim_row_base, h);
                let aborted = match cyclic_map.iter_mut().find(|(k, _)| *k == cyclic_key) {
                    Some((_, n)) => {
                        *n += 1;
                        *n > WIDTH as u32
                    }
                    None => {
                        if cyclic_map.len() >= SHUFFLE_HISTORY {
                            true
                        } else {
                            cyclic_map.push((cyclic_key, 1));
                            false
                        }
                    }
                };
                if aborted {
                    break; // start a new track with fresh randomness
                }

                // Swap h into the victim slot; the victim becomes the new h.
                let displaced = self.slots[victim_slot];
                self.slots[victim_slot] = h;
                h = displaced;

                // Try to place the new h in an empty slot among its
                // candidate rows, excluding the row just displaced from.
                let new_idx = self.indexer(h);
                let mut placed = None;
                for &base in &new_idx.row_base {
                    if base == victim_row_base {
                        continue;
                    }
                    for c in 0..WIDTH {
                        let slot = (base + c) as usize;
                        if self.slots[slot] == 0 {
                            placed = Some(slot);
                            break;
                        }
                    }
                    if placed.is_some() {
                        break;
                    }
                }
                if let Some(slot) = placed {
                    self.slots[slot] = h;
                    self.count += 1;
                    return InsertOutcome::ok();
                }
                // else continue the inner loop with the new h
            }
        }
        InsertOutcome::no_space()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Declared maximum key count.
    pub fn cap(&self) -> u64 {
        self.max
    }

    /// Occupancy as an integer percentage (`count * 100 / max`), or 0 if
    /// `max == 0`.
    pub fn ratio(&self) -> u64 {
        if self.max == 0 {
            0
        } else {
            self.count * 100 / self.max
        }
    }

    /// Ordered dump of the raw slot array (`depth * width` entries), for
    /// debug introspection. Placement order within Phase 1 is scan order
    /// (row 0 first), so this is byte-exact across runs seeded identically.
    pub fn dump(&self) -> Vec<u64> {
        self.slots.clone()
    }

    /// Write this table to `path` (`.keon` appended if missing), flushing
    /// and syncing before returning. See [`crate::snapshot`] for format
    /// details.
    pub fn write(&mut self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        crate::snapshot::write(self, path)
    }

    /// Re-write this table to the path it was last `write`n to or
    /// `load`ed from.
    pub fn save(&mut self) -> std::io::Result<()> {
        crate::snapshot::save(self)
    }

    /// Load a table from `path`. Always returns a table; `ok` is `false`
    /// when the checksum or payload length don't match the header.
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<(Table, bool)> {
        crate::snapshot::load(path)
    }

    /// Header-only read of a `.keon` file.
    pub fn info(path: impl AsRef<std::path::Path>) -> std::io::Result<crate::snapshot::SnapshotInfo> {
        crate::snapshot::info(path)
    }
}
