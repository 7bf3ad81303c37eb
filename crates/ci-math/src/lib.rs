//! Numerical building blocks shared by the spectrum and inference crates.
//!
//! - [`quad`]: adaptive Gauss–Kronrod integration with relative/absolute tolerances
//! - [`interp`]: piecewise-linear interpolation caches over strictly increasing grids

pub mod interp;
pub mod quad;

pub use interp::LinearInterpolator;
pub use quad::{Integrator, QuadResult};

/// `n + 1` equally spaced points from `lo` to `hi` inclusive.
pub fn linspace_steps(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![lo];
    }
    let step = (hi - lo) / n as f64;
    (0..=n).map(|i| if i == n { hi } else { lo + i as f64 * step }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_steps_endpoints() {
        let x = linspace_steps(500.0, 2800.0, 46);
        assert_eq!(x.len(), 47);
        assert_eq!(x[0], 500.0);
        assert_eq!(x[46], 2800.0);
        assert!((x[1] - 550.0).abs() < 1e-12);
        assert_eq!(linspace_steps(1.0, 2.0, 0), vec![1.0]);
    }
}
