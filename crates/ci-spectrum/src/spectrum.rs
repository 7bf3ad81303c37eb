//! Table-backed inclusive jet spectrum.
//!
//! Values are interpolated linearly between bin centres. A spectrum declared
//! positive stores `ln(value)` and exponentiates on read, which makes the
//! interpolation log-linear and keeps steeply falling spectra accurate.

use crate::validate_edges;
use ci_core::{Error, Result};
use ci_math::{Integrator, LinearInterpolator};

const ABS_TOL: f64 = 1e-9;
const REL_TOL: f64 = 1e-6;

/// Inclusive jet spectrum over a contiguous pT binning.
#[derive(Debug, Clone)]
pub struct JetSpectrum {
    pt_lo: Vec<f64>,
    pt_hi: Vec<f64>,
    pt_center: Vec<f64>,
    xsection: Vec<f64>,
    positive: bool,
    null: bool,
    interp: Option<LinearInterpolator>,
}

impl JetSpectrum {
    /// Build from `edges` (length `values.len() + 1`) and per-bin values.
    pub fn new(edges: &[f64], values: &[f64], positive: bool) -> Result<Self> {
        Self::with_corrections(edges, values, positive, None, None)
    }

    /// Build and apply multiplicative non-perturbative (`npc`) and electroweak
    /// (`ewkc`) corrections, each evaluated at the bin centres.
    pub fn with_corrections(
        edges: &[f64],
        values: &[f64],
        positive: bool,
        npc: Option<&LinearInterpolator>,
        ewkc: Option<&LinearInterpolator>,
    ) -> Result<Self> {
        validate_edges(edges, values.len())?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("spectrum values must be finite".into()));
        }

        let pt_lo = edges[..values.len()].to_vec();
        let pt_hi = edges[1..].to_vec();
        let pt_center: Vec<f64> =
            pt_lo.iter().zip(pt_hi.iter()).map(|(lo, hi)| 0.5 * (lo + hi)).collect();
        let mut xsection = values.to_vec();

        let null = xsection.iter().sum::<f64>() == 0.0;
        if null {
            log::debug!("JetSpectrum: null spectrum over [{}, {}]", edges[0], edges[values.len()]);
            return Ok(Self { pt_lo, pt_hi, pt_center, xsection, positive, null, interp: None });
        }

        if pt_center.len() < 2 {
            return Err(Error::Validation(
                "a non-null spectrum needs at least 2 bins to interpolate".into(),
            ));
        }

        for (x, &pt) in xsection.iter_mut().zip(pt_center.iter()) {
            if let Some(c) = npc {
                *x *= c.eval(pt);
            }
            if let Some(c) = ewkc {
                *x *= c.eval(pt);
            }
        }

        if positive {
            if let Some(i) = xsection.iter().position(|&v| v <= 0.0) {
                return Err(Error::Validation(format!(
                    "spectrum declared positive but bin {} has value {}",
                    i, xsection[i]
                )));
            }
            for x in xsection.iter_mut() {
                *x = x.ln();
            }
        }

        let interp = LinearInterpolator::new(pt_center.clone(), xsection.clone())?;
        Ok(Self { pt_lo, pt_hi, pt_center, xsection, positive, null, interp: Some(interp) })
    }

    /// Spectrum value at `pt`; 0 outside the bin-centre range or for a null spectrum.
    pub fn evaluate(&self, pt: f64) -> f64 {
        let Some(interp) = &self.interp else {
            return 0.0;
        };
        if !interp.contains(pt) {
            return 0.0;
        }
        let y = interp.eval(pt);
        if self.positive { y.exp() } else { y }
    }

    /// Integral over `[pt_low, pt_high]`; 0 if the range leaves the bin-centre
    /// range or the spectrum is null.
    pub fn integral(&self, pt_low: f64, pt_high: f64) -> Result<f64> {
        let Some(interp) = &self.interp else {
            return Ok(0.0);
        };
        if pt_low < interp.x_min() || pt_high > interp.x_max() {
            return Ok(0.0);
        }
        Integrator::with_rel_tol(REL_TOL).abs_tol(ABS_TOL).integrate(
            |pt| Ok(self.evaluate(pt)),
            pt_low,
            pt_high,
        )
    }

    /// Whether values are stored as logarithms.
    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// Whether the spectrum is identically zero.
    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Lower bin edges.
    pub fn pt_min(&self) -> &[f64] {
        &self.pt_lo
    }

    /// Upper bin edges.
    pub fn pt_max(&self) -> &[f64] {
        &self.pt_hi
    }

    /// Bin centres.
    pub fn pt_center(&self) -> &[f64] {
        &self.pt_center
    }

    /// Stored per-bin values (logarithms when positive).
    pub fn cross_section(&self) -> &[f64] {
        &self.xsection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn power_law(edges: &[f64]) -> Vec<f64> {
        edges.windows(2).map(|w| (0.5 * (w[0] + w[1]) / 100.0).powf(-5.0)).collect()
    }

    fn edges() -> Vec<f64> {
        (0..=40).map(|i| 100.0 + 100.0 * i as f64).collect()
    }

    #[test]
    fn test_positive_spectrum_reproduces_bin_centres() {
        let e = edges();
        let v = power_law(&e);
        let s = JetSpectrum::new(&e, &v, true).unwrap();
        assert!(s.is_positive());
        for (i, &pt) in s.pt_center().iter().enumerate() {
            assert_relative_eq!(s.evaluate(pt), v[i], max_relative = 1e-12);
            assert_relative_eq!(s.cross_section()[i], v[i].ln(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_log_linear_interpolation_is_exact_for_exponential() {
        let e = edges();
        let v: Vec<f64> = e.windows(2).map(|w| (-0.002 * 0.5 * (w[0] + w[1])).exp()).collect();
        let s = JetSpectrum::new(&e, &v, true).unwrap();
        assert_relative_eq!(s.evaluate(1234.0), (-0.002f64 * 1234.0).exp(), max_relative = 1e-10);
    }

    #[test]
    fn test_outside_centres_is_zero() {
        let e = edges();
        let s = JetSpectrum::new(&e, &power_law(&e), true).unwrap();
        assert_eq!(s.evaluate(100.0), 0.0);
        assert_eq!(s.evaluate(4100.0), 0.0);
        assert_eq!(s.integral(100.0, 500.0).unwrap(), 0.0);
    }

    #[test]
    fn test_null_spectrum() {
        let e = edges();
        let s = JetSpectrum::new(&e, &vec![0.0; 40], true).unwrap();
        assert!(s.is_null());
        assert_eq!(s.evaluate(1000.0), 0.0);
        assert_eq!(s.integral(500.0, 1000.0).unwrap(), 0.0);
    }

    #[test]
    fn test_integral_of_linear_spectrum() {
        let e = edges();
        let v: Vec<f64> = e.windows(2).map(|w| 2.0 * 0.5 * (w[0] + w[1])).collect();
        let s = JetSpectrum::new(&e, &v, false).unwrap();
        let i = s.integral(500.0, 1500.0).unwrap();
        assert_relative_eq!(i, 1500.0f64.powi(2) - 500.0f64.powi(2), max_relative = 1e-9);
    }

    #[test]
    fn test_corrections_are_applied() {
        let e = edges();
        let v = power_law(&e);
        let npc = LinearInterpolator::new(vec![0.0, 5000.0], vec![1.1, 1.1]).unwrap();
        let ewkc = LinearInterpolator::new(vec![0.0, 5000.0], vec![2.0, 2.0]).unwrap();
        let s = JetSpectrum::with_corrections(&e, &v, true, Some(&npc), Some(&ewkc)).unwrap();
        let pt = s.pt_center()[3];
        assert_relative_eq!(s.evaluate(pt), 2.2 * v[3], max_relative = 1e-12);
    }

    #[test]
    fn test_validation() {
        assert!(JetSpectrum::new(&[1.0, 2.0], &[1.0, 2.0], false).is_err());
        assert!(JetSpectrum::new(&[1.0, 1.0, 2.0], &[1.0, 2.0], false).is_err());
        assert!(JetSpectrum::new(&[1.0, 2.0, 3.0], &[1.0, -2.0], true).is_err());
        assert!(JetSpectrum::new(&[1.0, 2.0, 3.0], &[1.0, -2.0], false).is_ok());
    }
}
