//! Binned ensemble members: baseline (QCD) cross sections and the
//! contact-interaction correction.

use ci_core::{BaselineSpectrum, CorrectionSpectrum, Error, KAPPA_LEN, Kappa, Result};

/// Number of independent quadratic coefficients (`i <= j` pairs of kappa).
pub const N_QUADRATIC: usize = KAPPA_LEN * (KAPPA_LEN + 1) / 2;

/// Per-bin baseline cross sections.
#[derive(Debug, Clone, PartialEq)]
pub struct QcdSpectrum {
    values: Vec<f64>,
}

impl QcdSpectrum {
    /// Build from per-bin values. Values must be finite.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Validation(format!(
                "QCD spectrum bin {} is not finite: {}",
                i, values[i]
            )));
        }
        Ok(Self { values })
    }

    /// Per-bin values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl BaselineSpectrum for QcdSpectrum {
    fn value(&self, bin: usize) -> f64 {
        self.values[bin]
    }

    fn n_bins(&self) -> usize {
        self.values.len()
    }
}

/// Contact-interaction correction, quadratic in the coupling:
///
/// `ci(l, k, bin) = l * sum_i a[bin][i] k_i + l^2 * sum_{i<=j} b[bin][ij] k_i k_j`
///
/// The interference term is linear in `l`, the pure contact term quadratic.
#[derive(Debug, Clone, PartialEq)]
pub struct CiSpectrum {
    linear: Vec<[f64; KAPPA_LEN]>,
    quadratic: Vec<[f64; N_QUADRATIC]>,
}

impl CiSpectrum {
    /// Build from per-bin linear (6) and quadratic (21, `i <= j` row order) coefficients.
    pub fn new(linear: Vec<[f64; KAPPA_LEN]>, quadratic: Vec<[f64; N_QUADRATIC]>) -> Result<Self> {
        if linear.len() != quadratic.len() {
            return Err(Error::Validation(format!(
                "CI coefficient bin counts differ: {} linear, {} quadratic",
                linear.len(),
                quadratic.len()
            )));
        }
        let finite = linear.iter().flatten().chain(quadratic.iter().flatten()).all(|v| v.is_finite());
        if !finite {
            return Err(Error::Validation("CI coefficients must be finite".into()));
        }
        Ok(Self { linear, quadratic })
    }

    /// Correction that vanishes everywhere.
    pub fn zero(n_bins: usize) -> Self {
        Self { linear: vec![[0.0; KAPPA_LEN]; n_bins], quadratic: vec![[0.0; N_QUADRATIC]; n_bins] }
    }

    /// Correction values for every bin.
    pub fn evaluate_all(&self, lambda: f64, kappa: &Kappa) -> Vec<f64> {
        (0..self.linear.len()).map(|bin| self.value(lambda, kappa, bin)).collect()
    }
}

impl CorrectionSpectrum for CiSpectrum {
    fn value(&self, lambda: f64, kappa: &Kappa, bin: usize) -> f64 {
        let a = &self.linear[bin];
        let b = &self.quadratic[bin];
        let k = &kappa.0;

        let interference: f64 = a.iter().zip(k.iter()).map(|(ai, ki)| ai * ki).sum();

        let mut contact = 0.0;
        let mut idx = 0;
        for i in 0..KAPPA_LEN {
            for j in i..KAPPA_LEN {
                contact += b[idx] * k[i] * k[j];
                idx += 1;
            }
        }

        lambda * interference + lambda * lambda * contact
    }

    fn n_bins(&self) -> usize {
        self.linear.len()
    }
}
