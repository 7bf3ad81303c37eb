//! Piecewise-linear interpolation caches.
//!
//! A cache is always rebuilt from scratch from (x, y) samples; it is never
//! patched in place.

use ci_core::{Error, Result};

/// Piecewise-linear interpolant over strictly increasing abscissae.
///
/// Outside `[x_min, x_max]` the end values are returned. An interval with a
/// `-inf` end (the log of zero) evaluates to `-inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolator {
    /// Build from samples. Requires at least two points, equal lengths, and
    /// finite, strictly increasing `x`.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::Validation(format!(
                "interpolator x/y length mismatch: {} != {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(Error::Validation(format!(
                "interpolator needs at least 2 points, got {}",
                x.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("interpolator abscissae must be finite".into()));
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::Validation(format!(
                "interpolator abscissae must be strictly increasing: x[{}]={} >= x[{}]={}",
                i,
                x[i],
                i + 1,
                x[i + 1]
            )));
        }
        Ok(Self { x, y })
    }

    /// Evaluate at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if t <= self.x[0] {
            return self.y[0];
        }
        if t >= self.x[n - 1] {
            return self.y[n - 1];
        }
        // First index with x[i] > t; t is strictly inside, so 1 <= i <= n-1.
        let i = self.x.partition_point(|&v| v <= t);
        let (x0, x1) = (self.x[i - 1], self.x[i]);
        let (y0, y1) = (self.y[i - 1], self.y[i]);
        if t == x0 {
            // Exact node: do not mix in a possibly infinite neighbour (log of zero).
            return y0;
        }
        if y0 == f64::NEG_INFINITY || y1 == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
        let w = (t - x0) / (x1 - x0);
        y0 + w * (y1 - y0)
    }

    /// Sampled abscissae.
    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    /// Sampled ordinates.
    pub fn ys(&self) -> &[f64] {
        &self.y
    }

    /// First abscissa.
    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    /// Last abscissa.
    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Whether `t` lies in `[x_min, x_max]`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.x_min() && t <= self.x_max()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always `false` (construction requires two points).
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reproduces_nodes_and_midpoints() {
        let it = LinearInterpolator::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 6.0]).unwrap();
        assert_eq!(it.eval(0.0), 0.0);
        assert_eq!(it.eval(1.0), 2.0);
        assert_eq!(it.eval(3.0), 6.0);
        assert_relative_eq!(it.eval(0.5), 1.0);
        assert_relative_eq!(it.eval(2.0), 4.0);
    }

    #[test]
    fn test_clamps_outside_domain() {
        let it = LinearInterpolator::new(vec![1.0, 2.0], vec![10.0, 20.0]).unwrap();
        assert_eq!(it.eval(-5.0), 10.0);
        assert_eq!(it.eval(50.0), 20.0);
        assert!(it.contains(1.5));
        assert!(!it.contains(2.5));
    }

    #[test]
    fn test_rejects_bad_grids() {
        assert!(LinearInterpolator::new(vec![0.0], vec![1.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, 0.5], vec![1.0, 2.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, f64::NAN], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_infinite_neighbour_at_node() {
        let it =
            LinearInterpolator::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, f64::NEG_INFINITY]).unwrap();
        assert_eq!(it.eval(1.0), 1.0);
        assert_eq!(it.eval(2.0), f64::NEG_INFINITY);
        assert_eq!(it.eval(1.5), f64::NEG_INFINITY);
    }

    #[test]
    fn test_infinite_left_node() {
        let it = LinearInterpolator::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![f64::NEG_INFINITY, f64::NEG_INFINITY, 2.0, 4.0],
        )
        .unwrap();
        assert_eq!(it.eval(0.5), f64::NEG_INFINITY);
        assert_eq!(it.eval(1.5), f64::NEG_INFINITY);
        assert_eq!(it.eval(2.0), 2.0);
        assert_relative_eq!(it.eval(2.5), 3.0);
    }

    #[test]
    fn test_monotone_data_stays_monotone() {
        let x: Vec<f64> = (0..=20).map(|i| i as f64 * 0.05).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let it = LinearInterpolator::new(x, y).unwrap();
        let mut prev = f64::NEG_INFINITY;
        for k in 0..=1000 {
            let v = it.eval(k as f64 / 1000.0);
            assert!(v >= prev);
            prev = v;
        }
    }
}
