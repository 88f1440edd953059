//! Process-wide `Density` tunable.
//!
//! `Density` controls how much empty headroom a table reserves beyond its
//! declared capacity, and every table in the process should reserve it the
//! same way, so it lives as a single global knob read at construction time
//! rather than a per-instance config struct.
//!
//! Larger values pack the table denser (less empty headroom for the
//! shuffle engine to work with) at the cost of longer worst-case inserts
//! near capacity; smaller values insert faster but waste more memory.

use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_DENSITY: u64 = 40;

static DENSITY: AtomicU64 = AtomicU64::new(DEFAULT_DENSITY);

/// Read the current process-wide density.
pub fn get() -> u64 {
    DENSITY.load(Ordering::Relaxed)
}

/// Set the process-wide density. Takes effect for `Table`s constructed
/// afterwards; existing tables keep the depth computed at their own
/// construction time.
pub fn set(density: u64) {
    DENSITY.store(density, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Density is global state; serialize the tests that touch it.
    static GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn default_is_forty() {
        let _g = GUARD.lock().unwrap();
        set(DEFAULT_DENSITY);
        assert_eq!(get(), 40);
    }

    #[test]
    fn round_trips() {
        let _g = GUARD.lock().unwrap();
        set(80);
        assert_eq!(get(), 80);
        set(DEFAULT_DENSITY);
    }
}
