use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform random indices for `fill` and `randomize`.
pub trait RandomSource {
    /// A uniformly distributed value in `0..bound`. `bound` of 0 or 1 yields 0.
    fn below(&mut self, bound: usize) -> usize;
}

/// Operating-system randomness with rejection sampling.
///
/// If the OS source fails, draws continue from a splitmix64 stream seeded
/// with the clock.
#[derive(Debug, Default)]
pub struct OsRandom {
    fallback: Option<u64>,
}

impl OsRandom {
    pub fn new() -> Self {
        OsRandom::default()
    }

    fn next_u64(&mut self) -> u64 {
        if self.fallback.is_none() {
            let mut buf = [0u8; 8];
            match getrandom::getrandom(&mut buf) {
                Ok(()) => return u64::from_le_bytes(buf),
                Err(e) => {
                    tracing::warn!("OS randomness unavailable ({}), using a clock-seeded generator", e);
                    let seed = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_nanos() as u64)
                        .unwrap_or(0x9E37_79B9_7F4A_7C15);
                    self.fallback = Some(seed);
                }
            }
        }
        let state = self.fallback.get_or_insert(0);
        *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = *state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for OsRandom {
    fn below(&mut self, bound: usize) -> usize {
        if bound <= 1 {
            return 0;
        }
        let bound = bound as u64;
        // Largest multiple of `bound` that fits; draws above it are rejected.
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let draw = self.next_u64();
            if draw < zone {
                return (draw % bound) as usize;
            }
        }
    }
}

/// Replays a fixed sequence of draws, each reduced modulo the bound.
/// Useful for reproducible previews and tests.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<usize>,
    next: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<usize>) -> Self {
        SequenceRandom { values, next: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn below(&mut self, bound: usize) -> usize {
        if bound <= 1 || self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value % bound
    }
}

/// Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// `amount` distinct indices from `0..len`, capped at `len`, in draw order.
pub fn sample_indices(len: usize, amount: usize, rng: &mut dyn RandomSource) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..len).collect();
    let take = amount.min(len);
    for i in 0..take {
        let j = i + rng.below(len - i);
        pool.swap(i, j);
    }
    pool.truncate(take);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_stays_in_bounds() {
        let mut rng = OsRandom::new();
        for bound in [1, 2, 3, 7, 100] {
            for _ in 0..50 {
                assert!(rng.below(bound) < bound.max(1));
            }
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn sample_without_replacement() {
        let mut rng = OsRandom::new();
        let mut picked = sample_indices(10, 10, &mut rng);
        picked.sort();
        assert_eq!(picked, (0..10).collect::<Vec<_>>());
        assert_eq!(sample_indices(3, 50, &mut rng).len(), 3);
        assert!(sample_indices(0, 2, &mut rng).is_empty());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SequenceRandom::new(vec![3, 1, 4, 1, 5]);
        let mut items = vec!['a', 'b', 'c', 'd', 'e'];
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, vec!['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn sequence_random_is_reproducible() {
        let mut a = SequenceRandom::new(vec![0, 2, 1]);
        let mut b = SequenceRandom::new(vec![0, 2, 1]);
        let xs: Vec<usize> = (0..6).map(|_| a.below(3)).collect();
        let ys: Vec<usize> = (0..6).map(|_| b.below(3)).collect();
        assert_eq!(xs, ys);
        assert_eq!(xs, vec![0, 2, 1, 0, 2, 1]);
    }
}
