//! Injectable randomness for every draw.

use rand::Rng;

/// Minimal interface the samplers need from a random number generator.
///
/// Every `rand::Rng` qualifies, so callers typically pass a seeded `StdRng` or `SmallRng`.
pub trait RandomSource {
    /// Uniform index in `[0, n)`. `n` must be non-zero.
    fn next_index(&mut self, n: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_index(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }

    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

/// Picks one element of a non-empty slice uniformly.
pub(crate) fn pick<T: Copy, R: RandomSource + ?Sized>(pool: &[T], rng: &mut R) -> T {
    pool[rng.next_index(pool.len())]
}
