//! Core traits
//!
//! The posterior engine only sees [`Density`]; the likelihood model only sees
//! [`BaselineSpectrum`] and [`CorrectionSpectrum`]; the smearing engine only
//! sees [`UncertaintyTable`]. Concrete table-backed types live in
//! `ci-spectrum`.

use crate::Result;
use crate::types::Kappa;

/// A non-negative function of the parameter of interest.
///
/// Implemented by likelihoods and priors alike.
pub trait Density {
    /// Evaluate at `poi`.
    fn density(&self, poi: f64) -> Result<f64>;
}

impl<T: Density + ?Sized> Density for &T {
    fn density(&self, poi: f64) -> Result<f64> {
        (**self).density(poi)
    }
}

impl<T: Density + ?Sized> Density for Box<T> {
    fn density(&self, poi: f64) -> Result<f64> {
        (**self).density(poi)
    }
}

/// Flat prior: 1 everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatPrior;

impl Density for FlatPrior {
    fn density(&self, _poi: f64) -> Result<f64> {
        Ok(1.0)
    }
}

/// Closed-form density from a plain function or closure.
#[derive(Clone, Copy)]
pub struct FnDensity<F>(pub F);

impl<F> Density for FnDensity<F>
where
    F: Fn(f64) -> f64,
{
    fn density(&self, poi: f64) -> Result<f64> {
        Ok((self.0)(poi))
    }
}

impl<F> std::fmt::Debug for FnDensity<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnDensity(..)")
    }
}

/// Fractional jet-energy-scale uncertainty lookup.
///
/// Outside the covered domain implementations return a negative sentinel
/// instead of failing: `-1` (pT below), `-2` (pT above), `-3` (eta below),
/// `-4` (eta above).
pub trait UncertaintyTable {
    /// Fractional uncertainty at (`pt`, `eta`).
    fn fractional_uncertainty(&self, pt: f64, eta: f64) -> f64;
}

impl<T: UncertaintyTable + ?Sized> UncertaintyTable for &T {
    fn fractional_uncertainty(&self, pt: f64, eta: f64) -> f64 {
        (**self).fractional_uncertainty(pt, eta)
    }
}

/// Binned baseline (QCD) cross sections, one value per count bin.
pub trait BaselineSpectrum {
    /// Cross section in 0-based bin `bin`.
    fn value(&self, bin: usize) -> f64;

    /// Number of bins.
    fn n_bins(&self) -> usize;
}

/// Binned correction (contact-interaction) term.
pub trait CorrectionSpectrum {
    /// Correction in 0-based bin `bin` for coupling `lambda` and shape `kappa`.
    fn value(&self, lambda: f64, kappa: &Kappa, bin: usize) -> f64;

    /// Number of bins.
    fn n_bins(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Density for Constant {
        fn density(&self, _poi: f64) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_flat_prior() {
        assert_eq!(FlatPrior.density(-3.0).unwrap(), 1.0);
        assert_eq!(FlatPrior.density(1e6).unwrap(), 1.0);
    }

    #[test]
    fn test_fn_density() {
        let prior = FnDensity(|x: f64| (-x).exp());
        assert!((prior.density(0.0).unwrap() - 1.0).abs() < 1e-15);
        assert!((prior.density(1.0).unwrap() - (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_density_through_references() {
        let c = Constant(2.5);
        let by_ref: &dyn Density = &c;
        assert_eq!(by_ref.density(0.0).unwrap(), 2.5);
        let boxed: Box<dyn Density> = Box::new(Constant(0.5));
        assert_eq!(boxed.density(1.0).unwrap(), 0.5);
        assert_eq!((&&c).density(7.0).unwrap(), 2.5);
    }
}
