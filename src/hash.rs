//! The pinned 64-bit hash function.
//!
//! The hash is part of the `.keon` file-format ABI: any two instances that
//! want to share a snapshot must hash keys to slots the same way, so it is
//! pinned to a single well-distributed function rather than left
//! pluggable. This crate pins [`seahash`] to turn arbitrary byte strings
//! into the `u64`s used to index slots.
//!
//! A key whose hash happens to be exactly `0` is indistinguishable from an
//! empty slot and therefore cannot be stored. `seahash` makes this
//! vanishingly unlikely (1 in 2^64), but nothing here guards against it.

/// Hash an arbitrary byte string key to the 64-bit value stored in slots.
#[inline]
pub fn key_hash(key: &[u8]) -> u64 {
    seahash::hash(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(key_hash(b"hello"), key_hash(b"hello"));
    }

    #[test]
    fn distinguishes_keys() {
        assert_ne!(key_hash(b"hello"), key_hash(b"world"));
    }
}
