//! Bayesian posterior engine for a single parameter of interest.
//!
//! Combines a likelihood and a prior (both [`Density`]) on a closed interval:
//! normalization, posterior density, CDF, credible-level percentiles and the
//! posterior mode.

use crate::optimizer::{LbfgsOptimizer, ObjectiveFunction, OptimizerConfig};
use crate::roots::brent_root;
use ci_core::{Density, Error, FlatPrior, MapEstimate, Result, ensure_finite};
use ci_math::{Integrator, LinearInterpolator, linspace_steps};
use serde::{Deserialize, Serialize};

/// Posterior engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesConfig {
    /// Number of steps of the CDF cache grid (`n_steps + 1` points).
    pub n_steps: usize,
    /// Relative tolerance of the normalization and CDF integrals.
    pub rel_tol: f64,
    /// Minimizer iteration cap for [`Bayes::estimate`].
    pub max_iter: u64,
    /// Minimizer gradient tolerance for [`Bayes::estimate`].
    pub tol: f64,
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self { n_steps: 200, rel_tol: 1e-4, max_iter: 10_000, tol: 1e-5 }
    }
}

impl BayesConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Posterior `p(poi | data) ∝ L(poi) · prior(poi)` on `[poi_min, poi_max]`.
#[derive(Debug)]
pub struct Bayes<L, P = FlatPrior> {
    likelihood: L,
    prior: P,
    poi_min: f64,
    poi_max: f64,
    cl: f64,
    config: BayesConfig,
    normalization: f64,
    cdf_cache: Option<LinearInterpolator>,
}

impl<L: Density> Bayes<L> {
    /// Posterior with a flat prior at credibility level `cl`.
    pub fn new(likelihood: L, poi_range: (f64, f64), cl: f64) -> Result<Self> {
        Self::with_config(likelihood, poi_range, cl, BayesConfig::default())
    }

    /// Posterior with a flat prior and explicit configuration.
    pub fn with_config(
        likelihood: L,
        poi_range: (f64, f64),
        cl: f64,
        config: BayesConfig,
    ) -> Result<Self> {
        let (lo, hi) = poi_range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(Error::Validation(format!("invalid poi range [{lo}, {hi}]")));
        }
        validate_cl(cl)?;
        if config.n_steps == 0 {
            return Err(Error::Validation("CDF grid needs at least one step".into()));
        }
        Ok(Self {
            likelihood,
            prior: FlatPrior,
            poi_min: lo,
            poi_max: hi,
            cl,
            config,
            normalization: 0.0,
            cdf_cache: None,
        })
    }
}

impl<L: Density, P: Density> Bayes<L, P> {
    /// Replace the prior.
    pub fn with_prior<Q: Density>(self, prior: Q) -> Bayes<L, Q> {
        Bayes {
            likelihood: self.likelihood,
            prior,
            poi_min: self.poi_min,
            poi_max: self.poi_max,
            cl: self.cl,
            config: self.config,
            normalization: 0.0,
            cdf_cache: None,
        }
    }

    /// Likelihood at `poi`.
    pub fn likelihood(&self, poi: f64) -> Result<f64> {
        self.likelihood.density(poi)
    }

    /// Prior at `poi`.
    pub fn prior(&self, poi: f64) -> Result<f64> {
        self.prior.density(poi)
    }

    fn likeprior(&self, poi: f64) -> Result<f64> {
        if !poi.is_finite() {
            return Err(Error::NumericFault(format!("poi is {poi}")));
        }
        let value = self.likelihood.density(poi)? * self.prior.density(poi)?;
        ensure_finite(value, || format!("likelihood * prior at poi = {poi}"))
    }

    /// Integrate `likelihood * prior` over the domain and rebuild the CDF cache.
    pub fn normalize(&mut self) -> Result<f64> {
        self.cdf_cache = None;
        let (lo, hi) = (self.poi_min, self.poi_max);
        let norm = Integrator::with_rel_tol(self.config.rel_tol)
            .integrate(|x| self.likeprior(x), lo, hi)?;
        if !(norm.is_finite() && norm > 0.0) {
            return Err(Error::NumericFault(format!(
                "posterior normalization on [{lo}, {hi}] is {norm}"
            )));
        }

        let xs = linspace_steps(lo, hi, self.config.n_steps);
        let mut ys = Vec::with_capacity(xs.len());
        let mut sum = 0.0;
        ys.push(0.0);
        for &x in &xs[1..] {
            sum += self.likeprior(x)?;
            ys.push(sum);
        }
        if !(sum > 0.0) {
            return Err(Error::NumericFault(format!(
                "posterior vanishes on every CDF grid point in [{lo}, {hi}]"
            )));
        }
        for y in &mut ys {
            *y /= sum;
        }

        self.normalization = norm;
        self.cdf_cache = Some(LinearInterpolator::new(xs, ys)?);
        log::debug!("Bayes: normalization {norm:.6e} on [{lo}, {hi}]");
        Ok(norm)
    }

    fn ensure_normalized(&mut self) -> Result<()> {
        if self.cdf_cache.is_none() {
            self.normalize()?;
        }
        Ok(())
    }

    fn posterior_normalized(&self, poi: f64) -> Result<f64> {
        Ok(self.likeprior(poi)? / self.normalization)
    }

    /// Normalized posterior density at `poi`.
    pub fn posterior(&mut self, poi: f64) -> Result<f64> {
        self.ensure_normalized()?;
        self.posterior_normalized(poi)
    }

    /// Posterior CDF at `poi` by direct integration.
    pub fn cdf(&mut self, poi: f64) -> Result<f64> {
        if poi <= self.poi_min {
            return Ok(0.0);
        }
        if poi > self.poi_max {
            return Ok(1.0);
        }
        self.ensure_normalized()?;
        let integral = Integrator::with_rel_tol(self.config.rel_tol)
            .integrate(|x| self.likeprior(x), self.poi_min, poi)?;
        Ok(integral / self.normalization)
    }

    /// Parameter value at which the cached CDF reaches `p`.
    ///
    /// A positive `p` also becomes the new credibility level; `p <= 0` uses the
    /// current one.
    pub fn percentile(&mut self, p: f64) -> Result<f64> {
        if p > 0.0 {
            validate_cl(p)?;
            self.cl = p;
        }
        self.ensure_normalized()?;
        let cl = self.cl;
        let cache = self
            .cdf_cache
            .as_ref()
            .ok_or_else(|| Error::Computation("CDF cache missing after normalization".into()))?;
        let tol = 1e-10 * (self.poi_max - self.poi_min);
        brent_root(|x| Ok(cache.eval(x) - cl), self.poi_min, self.poi_max, tol).map_err(|e| {
            log::warn!("Bayes: percentile {cl} failed: {e}");
            e
        })
    }

    /// Posterior mode (MAP) and its curvature-based uncertainty.
    ///
    /// Starts from `guess`, or from `0.8 * min + 0.2 * max` when `guess <= 0`.
    pub fn estimate(&mut self, guess: f64) -> Result<MapEstimate> {
        self.ensure_normalized()?;
        let (lo, hi) = (self.poi_min, self.poi_max);
        let start = if guess > 0.0 { guess } else { 0.8 * lo + 0.2 * hi };
        let objective = NegLogPosterior { bayes: &*self, step: (hi - lo) / 2000.0 };

        let optimizer = LbfgsOptimizer::new(OptimizerConfig {
            max_iter: self.config.max_iter,
            tol: self.config.tol,
            ..OptimizerConfig::default()
        });
        let result = optimizer.minimize(&objective, start, (lo, hi))?;
        if !result.converged {
            log::warn!("Bayes: MAP estimate did not converge: {}", result.message);
            return Err(Error::NonConvergence(format!(
                "MAP estimate stopped after {} iterations: {}",
                result.n_iter, result.message
            )));
        }

        // Central second difference, kept inside the domain.
        let h = objective.step;
        let x = result.x.clamp(lo + h, hi - h);
        let curvature = objective.curvature(x)?;
        let uncertainty = if curvature > 0.0 {
            1.0 / curvature.sqrt()
        } else {
            log::warn!("Bayes: non-positive curvature {curvature} at the mode");
            f64::NAN
        };

        Ok(MapEstimate {
            poi: result.x,
            uncertainty,
            nlp: result.fval,
            converged: result.converged,
            n_iter: result.n_iter,
            message: result.message,
        })
    }

    /// Mark the normalization stale (e.g. after the likelihood's data changed).
    pub fn reset(&mut self) {
        self.cdf_cache = None;
        self.normalization = 0.0;
    }

    /// Current credibility level.
    pub fn cl(&self) -> f64 {
        self.cl
    }

    /// Domain of the parameter of interest.
    pub fn poi_range(&self) -> (f64, f64) {
        (self.poi_min, self.poi_max)
    }

    /// Shared access to the likelihood.
    pub fn likelihood_model(&self) -> &L {
        &self.likelihood
    }

    /// Mutable access to the likelihood. Call [`Bayes::reset`] after changing it.
    pub fn likelihood_model_mut(&mut self) -> &mut L {
        &mut self.likelihood
    }
}

fn validate_cl(cl: f64) -> Result<()> {
    if !(cl > 0.0 && cl <= 1.0) {
        return Err(Error::Validation(format!("credibility level must be in (0, 1], got {cl}")));
    }
    Ok(())
}

/// `-ln posterior` borrowing a normalized engine.
struct NegLogPosterior<'a, L, P> {
    bayes: &'a Bayes<L, P>,
    step: f64,
}

impl<L: Density, P: Density> ObjectiveFunction for NegLogPosterior<'_, L, P> {
    fn eval(&self, poi: f64) -> Result<f64> {
        let p = self.bayes.posterior_normalized(poi)?;
        if p.is_nan() || p < 0.0 {
            return Err(Error::NumericFault(format!("posterior at poi = {poi} is {p}")));
        }
        // Underflowed tails become a plateau instead of +inf.
        Ok(-p.max(f64::from_bits(1)).ln())
    }

    fn step(&self, _poi: f64) -> f64 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ci_core::FnDensity;

    fn gaussian(mean: f64, sigma: f64) -> FnDensity<impl Fn(f64) -> f64> {
        FnDensity(move |x: f64| (-0.5 * ((x - mean) / sigma).powi(2)).exp())
    }

    #[test]
    fn test_posterior_integrates_to_one() {
        let mut b = Bayes::new(gaussian(0.4, 0.1), (0.0, 1.0), 0.95).unwrap();
        let norm = b.normalize().unwrap();
        let total = Integrator::with_rel_tol(1e-8)
            .integrate(|x| b.posterior_normalized(x), 0.0, 1.0)
            .unwrap();
        assert_relative_eq!(total, 1.0, max_relative = 1e-3);
        assert_relative_eq!(b.posterior(0.4).unwrap(), 1.0 / norm, max_relative = 1e-12);
    }

    #[test]
    fn test_cdf_bounds_and_monotone() {
        let mut b = Bayes::new(gaussian(0.3, 0.15), (0.0, 1.0), 0.95).unwrap();
        assert_eq!(b.cdf(0.0).unwrap(), 0.0);
        assert_eq!(b.cdf(-1.0).unwrap(), 0.0);
        assert_relative_eq!(b.cdf(1.0).unwrap(), 1.0, max_relative = 1e-12);
        assert_eq!(b.cdf(2.0).unwrap(), 1.0);
        let mut prev = 0.0;
        for k in 1..=20 {
            let c = b.cdf(k as f64 / 20.0).unwrap();
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn test_percentile_inverts_cdf() {
        let mut b = Bayes::new(gaussian(0.3, 0.15), (0.0, 1.0), 0.95).unwrap();
        let lambda0 = 0.45;
        let p = b.cdf(lambda0).unwrap();
        let back = b.percentile(p).unwrap();
        // Within the CDF grid resolution (200 steps).
        assert!((back - lambda0).abs() < 2.0 / 200.0, "back={back}");
        assert_eq!(b.cl(), p);
    }

    #[test]
    fn test_percentile_keeps_cl_for_non_positive_p() {
        let mut b = Bayes::new(gaussian(0.5, 0.1), (0.0, 1.0), 0.5).unwrap();
        let median = b.percentile(0.0).unwrap();
        assert_eq!(b.cl(), 0.5);
        assert!((median - 0.5).abs() < 0.01, "median={median}");
        assert!(b.percentile(1.5).is_err());
    }

    #[test]
    fn test_estimate_recovers_gaussian() {
        let mut b = Bayes::new(gaussian(0.3, 0.1), (0.0, 1.0), 0.95).unwrap();
        let est = b.estimate(0.0).unwrap();
        assert!(est.converged);
        assert_relative_eq!(est.poi, 0.3, epsilon = 1e-3);
        assert_relative_eq!(est.uncertainty, 0.1, max_relative = 1e-2);
    }

    #[test]
    fn test_prior_shifts_mode() {
        // Gaussian likelihood N(0.5, 0.1) times Gaussian prior N(0.3, 0.1) peaks at 0.4.
        let mut b =
            Bayes::new(gaussian(0.5, 0.1), (0.0, 1.0), 0.95).unwrap().with_prior(gaussian(0.3, 0.1));
        assert_relative_eq!(b.prior(0.3).unwrap(), 1.0);
        let est = b.estimate(0.6).unwrap();
        assert_relative_eq!(est.poi, 0.4, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_likelihood_is_numeric_fault() {
        let mut b = Bayes::new(FnDensity(|_x: f64| 0.0), (0.0, 1.0), 0.95).unwrap();
        assert!(matches!(b.normalize(), Err(Error::NumericFault(_))));
    }

    #[test]
    fn test_nan_poi_is_numeric_fault() {
        let mut b = Bayes::new(gaussian(0.5, 0.1), (0.0, 1.0), 0.95).unwrap();
        assert!(matches!(b.posterior(f64::NAN), Err(Error::NumericFault(_))));
    }

    #[test]
    fn test_reset_renormalizes() {
        let mut b = Bayes::new(gaussian(0.5, 0.1), (0.0, 1.0), 0.95).unwrap();
        let first = b.normalize().unwrap();
        b.reset();
        let p = b.posterior(0.5).unwrap();
        assert_relative_eq!(p * first, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Bayes::new(FlatPrior, (1.0, 0.0), 0.95).is_err());
        assert!(Bayes::new(FlatPrior, (0.0, 1.0), 0.0).is_err());
        assert!(Bayes::new(FlatPrior, (0.0, 1.0), 1.2).is_err());
    }

    #[test]
    fn test_config_json() {
        let cfg = BayesConfig::from_json_str(r#"{"n_steps": 400}"#).unwrap();
        assert_eq!(cfg.n_steps, 400);
        assert_eq!(cfg.rel_tol, 1e-4);
        assert_eq!(cfg.max_iter, 10_000);
    }
}
