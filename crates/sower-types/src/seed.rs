//! The seed value type and its validity predicate.
//!
//! Seeds are plain 32-bit unsigned integers. The value `0` is reserved:
//! it means "no seed" and is never handed out as a computed seed.
//!
//! # Example
//!
//! ```
//! use sower_types::{is_seed_valid, Seed, INVALID_SEED};
//!
//! let seed: Seed = 42;
//! assert!(is_seed_valid(seed));
//! assert!(!is_seed_valid(INVALID_SEED));
//! ```

/// Type of the seeds served to random engines.
pub type Seed = u32;

/// The distinguished "no seed" value.
///
/// `INVALID_SEED` never names a valid computed seed; policies that would
/// produce it remap the result (see the per-event hashing algorithm).
pub const INVALID_SEED: Seed = 0;

/// Returns `true` if `seed` is a usable seed value.
///
/// This is the single authoritative predicate: everything that needs to
/// distinguish "seeded" from "not seeded" goes through here.
///
/// # Example
///
/// ```
/// use sower_types::{is_seed_valid, INVALID_SEED};
///
/// assert!(is_seed_valid(1));
/// assert!(is_seed_valid(u32::MAX));
/// assert!(!is_seed_valid(INVALID_SEED));
/// ```
#[must_use]
pub fn is_seed_valid(seed: Seed) -> bool {
    seed != INVALID_SEED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_seed_is_zero() {
        assert_eq!(INVALID_SEED, 0);
    }

    #[test]
    fn validity_is_nonzero() {
        assert!(!is_seed_valid(0));
        assert!(is_seed_valid(1));
        assert!(is_seed_valid(900_000_000));
        assert!(is_seed_valid(Seed::MAX));
    }
}
