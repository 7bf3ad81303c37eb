//! Reco-level jet spectrum: Gaussian response convolution with jet energy
//! scale (JES) and resolution (JER) pulls.
//!
//! The convolution is evaluated once per grid point at construction (and on
//! [`SmearedSpectrum::set_pulls`]); afterwards every evaluation is a lookup in
//! a (log-)linear interpolation cache.

use crate::binned::QcdSpectrum;
use crate::resolution::{ResolutionModel, WeightedQuadrature};
use crate::spectrum::JetSpectrum;
use crate::validate_edges;
use ci_core::{Error, Result, UncertaintyTable};
use ci_math::{Integrator, LinearInterpolator, linspace_steps};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

/// Floor on the effective scale and width factors under extreme pulls.
const FACTOR_FLOOR: f64 = 1e-3;

/// Smearing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmearingConfig {
    /// First grid point (GeV).
    pub pt_min: f64,
    /// Last grid point (GeV).
    pub pt_max: f64,
    /// Number of grid steps (the grid has `n_steps + 1` points).
    pub n_steps: usize,
    /// Fractional JER uncertainty.
    pub jer_uncertainty: f64,
    /// JES pull (standard deviations).
    pub x: f64,
    /// JER pull (standard deviations).
    pub y: f64,
    /// True-pT window for the convolution; defaults to the grid range.
    pub truth_range: Option<(f64, f64)>,
    /// Half-width of the convolution window in units of sigma(pT).
    pub window_sigmas: f64,
    /// Relative tolerance of the convolution and sub-range integrals.
    pub rel_tol: f64,
    /// Pseudorapidity at which the JES table is read.
    pub eta: f64,
}

impl Default for SmearingConfig {
    fn default() -> Self {
        Self {
            pt_min: 500.0,
            pt_max: 2800.0,
            n_steps: 46,
            jer_uncertainty: 0.1,
            x: 0.0,
            y: 0.0,
            truth_range: None,
            window_sigmas: 5.0,
            rel_tol: 1e-4,
            eta: 0.0,
        }
    }
}

impl SmearingConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    fn validate(&self) -> Result<()> {
        if !(self.pt_min.is_finite() && self.pt_max.is_finite() && self.pt_max > self.pt_min) {
            return Err(Error::Validation(format!(
                "smearing grid range invalid: [{}, {}]",
                self.pt_min, self.pt_max
            )));
        }
        if self.n_steps == 0 {
            return Err(Error::Validation("smearing grid needs at least one step".into()));
        }
        if let Some((lo, hi)) = self.truth_range {
            if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                return Err(Error::Validation(format!("truth range invalid: [{lo}, {hi}]")));
            }
        }
        if !(self.rel_tol > 0.0 && self.window_sigmas > 0.0) {
            return Err(Error::Validation(
                "rel_tol and window_sigmas must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Smeared (reco-level) version of a [`JetSpectrum`].
pub struct SmearedSpectrum<'a> {
    spectrum: &'a JetSpectrum,
    jes: Option<&'a dyn UncertaintyTable>,
    resolution: Box<dyn ResolutionModel + 'a>,
    config: SmearingConfig,
    pt: Vec<f64>,
    cache: Option<LinearInterpolator>,
}

impl std::fmt::Debug for SmearedSpectrum<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmearedSpectrum")
            .field("config", &self.config)
            .field("smeared", &self.jes.is_some())
            .field("n_points", &self.pt.len())
            .field("null", &self.cache.is_none())
            .finish()
    }
}

impl<'a> SmearedSpectrum<'a> {
    /// Smear `spectrum` with the default resolution model.
    ///
    /// Without a JES table (`jes = None`) the raw spectrum is cached unsmeared.
    pub fn new(
        spectrum: &'a JetSpectrum,
        jes: Option<&'a dyn UncertaintyTable>,
        config: SmearingConfig,
    ) -> Result<Self> {
        Self::with_resolution(spectrum, jes, Box::new(WeightedQuadrature::default()), config)
    }

    /// Smear `spectrum` with an explicit resolution model.
    pub fn with_resolution(
        spectrum: &'a JetSpectrum,
        jes: Option<&'a dyn UncertaintyTable>,
        resolution: Box<dyn ResolutionModel + 'a>,
        config: SmearingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pt = linspace_steps(config.pt_min, config.pt_max, config.n_steps);
        let mut s = Self { spectrum, jes, resolution, config, pt, cache: None };
        s.rebuild()?;
        Ok(s)
    }

    /// Change the JES/JER pulls and rebuild the cache.
    pub fn set_pulls(&mut self, x: f64, y: f64) -> Result<()> {
        self.config.x = x;
        self.config.y = y;
        self.rebuild()
    }

    fn rebuild(&mut self) -> Result<()> {
        self.cache = None;
        if self.spectrum.is_null() {
            return Ok(());
        }
        let mut values = Vec::with_capacity(self.pt.len());
        for &p in &self.pt {
            let v = if self.jes.is_some() { self.smear(p)? } else { self.spectrum.evaluate(p) };
            values.push(if self.spectrum.is_positive() { v.ln() } else { v });
        }
        log::debug!(
            "SmearedSpectrum: cached {} points on [{}, {}] (x={}, y={})",
            values.len(),
            self.config.pt_min,
            self.config.pt_max,
            self.config.x,
            self.config.y
        );
        self.cache = Some(LinearInterpolator::new(self.pt.clone(), values)?);
        Ok(())
    }

    /// Convolution of the response with the true spectrum at reco `pt_reco`.
    pub fn smear(&self, pt_reco: f64) -> Result<f64> {
        if self.spectrum.is_null() {
            return Ok(0.0);
        }
        let (tmin, tmax) = self.config.truth_range.unwrap_or((self.config.pt_min, self.config.pt_max));
        let offset = self.config.window_sigmas * self.resolution.sigma(pt_reco);
        let lo = tmin.max(pt_reco - offset);
        let hi = tmax.min(pt_reco + offset);
        if !(hi > lo) {
            return Ok(0.0);
        }
        Integrator::with_rel_tol(self.config.rel_tol).integrate(
            |pt| Ok(self.response(pt_reco, pt)? * self.spectrum.evaluate(pt)),
            lo,
            hi,
        )
    }

    /// Gaussian response density of reco `pt_reco` given true `pt`.
    pub fn response(&self, pt_reco: f64, pt: f64) -> Result<f64> {
        let scale = self.scale_uncertainty(pt_reco);
        let x_factor = (1.0 + self.config.x * scale).max(FACTOR_FLOOR);
        let y_factor = (1.0 + self.config.y * self.config.jer_uncertainty).max(FACTOR_FLOOR);
        let width = y_factor * self.resolution.sigma(pt);
        let gauss = Normal::new(pt, width).map_err(|e| {
            Error::NumericFault(format!("response width {width} at pT = {pt}: {e}"))
        })?;
        Ok(gauss.pdf(pt_reco / x_factor))
    }

    /// JES uncertainty at reco pT; sentinels (outside the table) count as no uncertainty.
    fn scale_uncertainty(&self, pt_reco: f64) -> f64 {
        match self.jes {
            Some(table) => {
                let u = table.fractional_uncertainty(pt_reco, self.config.eta);
                if u < 0.0 {
                    log::trace!("JES table miss at pT = {pt_reco} (code {u})");
                    0.0
                } else {
                    u
                }
            }
            None => 0.0,
        }
    }

    /// Absolute resolution at `pt`.
    pub fn sigma(&self, pt: f64) -> f64 {
        self.resolution.sigma(pt)
    }

    /// Smeared spectrum at `pt`; 0 outside the grid or for a null baseline.
    pub fn evaluate(&self, pt: f64) -> Result<f64> {
        let Some(cache) = &self.cache else {
            return Ok(0.0);
        };
        if !cache.contains(pt) {
            return Ok(0.0);
        }
        let y = cache.eval(pt);
        let value = if self.spectrum.is_positive() { y.exp() } else { y };
        if !value.is_finite() {
            return Err(Error::NumericFault(format!(
                "SmearedSpectrum: {value} at pT = {pt}"
            )));
        }
        Ok(value)
    }

    /// Integral over `[pt_low, pt_high]`; 0 if the range leaves the grid.
    pub fn integral(&self, pt_low: f64, pt_high: f64) -> Result<f64> {
        let Some(cache) = &self.cache else {
            return Ok(0.0);
        };
        if pt_low < cache.x_min() || pt_high > cache.x_max() {
            return Ok(0.0);
        }
        Integrator::with_rel_tol(self.config.rel_tol).integrate(|pt| self.evaluate(pt), pt_low, pt_high)
    }

    /// Integrate over each bin of `edges`, giving a baseline ensemble member.
    pub fn reco_to_bins(&self, edges: &[f64]) -> Result<QcdSpectrum> {
        if edges.len() < 2 {
            return Err(Error::Validation("need at least 2 bin edges".into()));
        }
        validate_edges(edges, edges.len() - 1)?;
        let values =
            edges.windows(2).map(|w| self.integral(w[0], w[1])).collect::<Result<Vec<_>>>()?;
        QcdSpectrum::new(values)
    }

    /// Cached (pT, stored value) samples; empty for a null baseline.
    pub fn grid(&self) -> (&[f64], &[f64]) {
        match &self.cache {
            Some(c) => (c.xs(), c.ys()),
            None => (&[], &[]),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &SmearingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jec::JecUncertainty;
    use crate::resolution::ConstantFraction;
    use approx::assert_relative_eq;

    fn baseline() -> JetSpectrum {
        let edges: Vec<f64> = (0..=45).map(|i| 100.0 + 100.0 * i as f64).collect();
        let values: Vec<f64> =
            edges.windows(2).map(|w| 1e6 * (-0.004 * 0.5 * (w[0] + w[1])).exp()).collect();
        JetSpectrum::new(&edges, &values, true).unwrap()
    }

    fn config() -> SmearingConfig {
        SmearingConfig { truth_range: Some((200.0, 4000.0)), ..SmearingConfig::default() }
    }

    #[test]
    fn test_outside_grid_is_zero() {
        let s = baseline();
        let sm = SmearedSpectrum::new(&s, None, config()).unwrap();
        assert_eq!(sm.evaluate(499.9).unwrap(), 0.0);
        assert_eq!(sm.evaluate(2800.1).unwrap(), 0.0);
        assert_eq!(sm.integral(400.0, 600.0).unwrap(), 0.0);
        assert!(sm.evaluate(1000.0).unwrap() > 0.0);
    }

    #[test]
    fn test_null_baseline_is_zero() {
        let edges: Vec<f64> = (0..=10).map(|i| 100.0 * (i + 1) as f64).collect();
        let s = JetSpectrum::new(&edges, &vec![0.0; 10], true).unwrap();
        let jes = JecUncertainty::uniform(0.02, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let sm = SmearedSpectrum::new(&s, Some(&jes), config()).unwrap();
        assert_eq!(sm.evaluate(1000.0).unwrap(), 0.0);
        assert_eq!(sm.integral(600.0, 900.0).unwrap(), 0.0);
        assert_eq!(sm.grid().0.len(), 0);
    }

    #[test]
    fn test_unsmeared_cache_matches_baseline() {
        let s = baseline();
        let sm = SmearedSpectrum::new(&s, None, config()).unwrap();
        for pt in [500.0, 1000.0, 1550.0, 2800.0] {
            assert_relative_eq!(sm.evaluate(pt).unwrap(), s.evaluate(pt), max_relative = 1e-3);
        }
        assert_eq!(sm.grid().0.len(), 47);
    }

    #[test]
    fn test_narrow_response_reproduces_baseline() {
        let s = baseline();
        let jes = JecUncertainty::uniform(0.02, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let sm = SmearedSpectrum::with_resolution(
            &s,
            Some(&jes),
            Box::new(ConstantFraction(1e-3)),
            config(),
        )
        .unwrap();
        for pt in [600.0, 1200.0, 2000.0] {
            assert_relative_eq!(sm.evaluate(pt).unwrap(), s.evaluate(pt), max_relative = 1e-3);
        }
    }

    #[test]
    fn test_smearing_raises_falling_spectrum() {
        // Migration from the more populated low-pT side increases the reco yield.
        let s = baseline();
        let jes = JecUncertainty::uniform(0.02, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let sm = SmearedSpectrum::with_resolution(
            &s,
            Some(&jes),
            Box::new(ConstantFraction(0.1)),
            config(),
        )
        .unwrap();
        assert!(sm.evaluate(1500.0).unwrap() > s.evaluate(1500.0));
    }

    #[test]
    fn test_jes_pull_shifts_spectrum() {
        let s = baseline();
        let jes = JecUncertainty::uniform(0.05, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let mut sm = SmearedSpectrum::new(&s, Some(&jes), config()).unwrap();
        let nominal = sm.evaluate(1500.0).unwrap();
        sm.set_pulls(1.0, 0.0).unwrap();
        let up = sm.evaluate(1500.0).unwrap();
        // A higher energy scale pushes jets up in pT on a falling spectrum.
        assert!(up > nominal, "up={up} nominal={nominal}");
        assert_eq!(sm.config().x, 1.0);
    }

    #[test]
    fn test_response_floor_under_extreme_pulls() {
        let s = baseline();
        let jes = JecUncertainty::uniform(0.5, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let cfg = SmearingConfig { x: -10.0, y: -50.0, ..config() };
        let sm = SmearedSpectrum::new(&s, Some(&jes), cfg).unwrap();
        let r = sm.response(1000.0, 1000.0).unwrap();
        assert!(r.is_finite());
    }

    #[test]
    fn test_response_is_normalised_in_reco() {
        let s = baseline();
        let jes = JecUncertainty::uniform(0.0, (10.0, 5000.0), (-3.0, 3.0)).unwrap();
        let sm = SmearedSpectrum::new(&s, Some(&jes), config()).unwrap();
        let sigma = sm.sigma(1500.0);
        let norm = Integrator::with_rel_tol(1e-8)
            .integrate(|r| sm.response(r, 1500.0), 1500.0 - 8.0 * sigma, 1500.0 + 8.0 * sigma)
            .unwrap();
        assert_relative_eq!(norm, 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_reco_to_bins() {
        let s = baseline();
        let sm = SmearedSpectrum::new(&s, None, config()).unwrap();
        let q = sm.reco_to_bins(&[600.0, 700.0, 800.0, 3000.0]).unwrap();
        assert_eq!(q.values().len(), 3);
        assert!(q.values()[0] > q.values()[1]);
        // Last bin leaves the grid.
        assert_eq!(q.values()[2], 0.0);
        assert!(sm.reco_to_bins(&[600.0]).is_err());
    }

    #[test]
    fn test_config_json_defaults() {
        let cfg = SmearingConfig::from_json_str(r#"{"n_steps": 10, "x": 1.5}"#).unwrap();
        assert_eq!(cfg.n_steps, 10);
        assert_eq!(cfg.x, 1.5);
        assert_eq!(cfg.pt_min, 500.0);
        assert_eq!(cfg.window_sigmas, 5.0);
        assert!(SmearingConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_grid_below_baseline_coverage_is_zero() {
        // Bin centres 650..2950: the first grid points (500, 550, 600) hold ln(0).
        let edges: Vec<f64> = (0..=24).map(|i| 600.0 + 100.0 * i as f64).collect();
        let values: Vec<f64> =
            edges.windows(2).map(|w| 1e6 * (-0.004 * 0.5 * (w[0] + w[1])).exp()).collect();
        let s = JetSpectrum::new(&edges, &values, true).unwrap();
        let sm = SmearedSpectrum::new(&s, None, SmearingConfig::default()).unwrap();
        assert_eq!(sm.grid().1[0], f64::NEG_INFINITY);

        assert_eq!(sm.evaluate(500.0).unwrap(), 0.0);
        assert_eq!(sm.evaluate(525.0).unwrap(), 0.0);
        assert_eq!(sm.evaluate(625.0).unwrap(), 0.0);
        assert_relative_eq!(sm.evaluate(650.0).unwrap(), s.evaluate(650.0), max_relative = 1e-9);

        let integral = sm.integral(500.0, 700.0).unwrap();
        assert!(integral.is_finite() && integral > 0.0, "integral={integral}");
        let q = sm.reco_to_bins(&[500.0, 700.0, 900.0]).unwrap();
        assert!(q.values().iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_overflowing_baseline_is_numeric_fault() {
        // Linear storage: the slope between the first two centres overflows.
        let edges = [400.0, 1400.0, 2400.0, 3400.0];
        let s = JetSpectrum::new(&edges, &[f64::MAX, -f64::MAX, 1.0], false).unwrap();
        let sm = SmearedSpectrum::new(&s, None, SmearingConfig::default()).unwrap();
        assert!(matches!(sm.evaluate(1000.0), Err(Error::NumericFault(_))));
        assert_eq!(sm.evaluate(450.0).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let s = baseline();
        let cfg = SmearingConfig { pt_min: 3000.0, ..SmearingConfig::default() };
        assert!(SmearedSpectrum::new(&s, None, cfg).is_err());
    }
}
