//! Deterministic random-number sources for per-record transforms.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Mixing constant for seed derivation (splitmix64 increment)
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Create the RNG for one record's randomized decisions
///
/// With a configured base seed the RNG is a pure function of
/// `(seed, person_id)`, so re-running a record reproduces the same
/// truncation and masking outcomes. Without a seed the RNG is drawn from
/// the OS.
#[must_use]
pub fn record_rng(base_seed: Option<u64>, person_id: i64) -> StdRng {
    match base_seed {
        Some(seed) => {
            let derived = seed ^ (person_id as u64).wrapping_mul(SEED_MIX);
            StdRng::seed_from_u64(derived)
        }
        None => StdRng::from_os_rng(),
    }
}
