//! Toy data generation utilities (Poisson pseudo-data, bootstrap indices).

use ci_core::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Sample one Poisson-fluctuated dataset from a vector of expectations.
///
/// Non-positive or non-finite expectations yield 0.
pub fn poisson_from_expected<R: Rng + ?Sized>(expected: &[f64], rng: &mut R) -> Vec<f64> {
    expected
        .iter()
        .map(|&lam| {
            if !lam.is_finite() || lam <= 0.0 {
                return 0.0;
            }
            match Poisson::new(lam) {
                Ok(pois) => pois.sample(rng),
                Err(_) => 0.0,
            }
        })
        .collect()
}

/// `k` ensemble indices drawn uniformly (with replacement) from `[0, n)`.
pub fn bootstrap_index<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Result<Vec<usize>> {
    if n == 0 {
        return Err(Error::Validation("cannot bootstrap an empty ensemble".into()));
    }
    Ok((0..k).map(|_| rng.gen_range(0..n)).collect())
}

/// Identity index `[0, 1, ..., n-1]`.
pub fn identity_index(n: usize) -> Vec<usize> {
    (0..n).collect()
}
