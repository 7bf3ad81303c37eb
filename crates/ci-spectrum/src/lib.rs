//! # ci-spectrum
//!
//! Inclusive jet spectra and the detector-response model:
//! - [`JetSpectrum`]: table-backed theory spectrum with log-linear interpolation
//! - [`JecUncertainty`]: (pT, eta) jet-energy-scale uncertainty table
//! - [`ResolutionModel`]: pluggable jet pT resolution parameterisations
//! - [`SmearedSpectrum`]: reco-level spectrum from a Gaussian response convolution
//! - [`QcdSpectrum`] / [`CiSpectrum`]: binned ensemble members for the likelihood

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binned;
pub mod jec;
pub mod resolution;
pub mod smeared;
pub mod spectrum;

pub use binned::{CiSpectrum, N_QUADRATIC, QcdSpectrum};
pub use jec::JecUncertainty;
pub use resolution::{
    ConstantFraction, ResolutionModel, ResolutionTerm, SmpPolynomial, WeightedQuadrature,
};
pub use smeared::{SmearedSpectrum, SmearingConfig};
pub use spectrum::JetSpectrum;

use ci_core::{Error, Result};

/// Check that bin edges are finite, strictly increasing and describe `n_bins` bins.
pub(crate) fn validate_edges(edges: &[f64], n_bins: usize) -> Result<()> {
    if edges.len() != n_bins + 1 {
        return Err(Error::Validation(format!(
            "expected {} bin edges for {} bins, got {}",
            n_bins + 1,
            n_bins,
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(Error::Validation("bin edges must be finite".into()));
    }
    if let Some(i) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::Validation(format!(
            "bin edges must be strictly increasing: edge[{}]={} >= edge[{}]={}",
            i,
            edges[i],
            i + 1,
            edges[i + 1]
        )));
    }
    Ok(())
}
