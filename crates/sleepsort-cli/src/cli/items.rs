use rand::{Rng, SeedableRng, rngs::StdRng};
use sleepsort::Item;

/// Seed used when `--seed` is not given, so repeated runs sort the same list.
const FIXED_SEED: u64 = 1;

/// Generates `count` items uniformly distributed in `[0, max_value)`.
///
/// `max_value` must be non-zero.
pub fn generate_items(count: usize, max_value: u64, seed: bool) -> Vec<Item> {
    if seed {
        fill(&mut rand::rng(), count, max_value)
    } else {
        fill(&mut StdRng::seed_from_u64(FIXED_SEED), count, max_value)
    }
}

fn fill<R: Rng>(rng: &mut R, count: usize, max_value: u64) -> Vec<Item> {
    (0..count).map(|_| rng.random_range(0..max_value)).collect()
}
