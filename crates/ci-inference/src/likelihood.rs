//! Multinomial likelihood of inclusive jet counts over a spectrum ensemble.
//!
//! Each ensemble member pairs a baseline spectrum with a contact-interaction
//! correction. The likelihood is either evaluated for one member or
//! marginalized over the members referenced by a (possibly bootstrapped)
//! index. A coupling-space interpolation cache makes repeated evaluation
//! during normalization and root finding cheap.
//!
//! Cache state is explicit: [`InclusiveJetLikelihood::initialize`] builds the
//! cache; every mutator except [`InclusiveJetLikelihood::set_lambda`] drops it.

use crate::toys;
use ci_core::{
    BaselineSpectrum, BinRange, CorrectionSpectrum, Density, Error, Kappa, Result, ensure_finite,
};
use ci_math::{LinearInterpolator, linspace_steps};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Likelihood configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodConfig {
    /// Number of steps of the coupling cache grid (`n_steps + 1` points).
    pub n_steps: usize,
    /// Seed of the bootstrap / pseudo-data generator.
    pub seed: u64,
}

impl Default for LikelihoodConfig {
    fn default() -> Self {
        Self { n_steps: 250, seed: 42 }
    }
}

impl LikelihoodConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Multinomial log-likelihood ratio of counts `n` against expectations `p`.
///
/// Returns `sum_i n_i ln((p_i/S)/(n_i/T))` over bins with `n_i > 0`, with
/// `S = sum p` and `T = sum n`. Positive and negative terms are accumulated
/// separately. The maximum, 0, is reached when `p/S == n/T`.
pub fn log_multinomial(n: &[f64], p: &[f64]) -> f64 {
    let s: f64 = p.iter().sum();
    let t: f64 = n.iter().sum();
    let mut zplus = 0.0;
    let mut zminus = 0.0;
    for (&ni, &pi) in n.iter().zip(p) {
        if ni <= 0.0 {
            continue;
        }
        let nlnp = ni * ((pi / s) / (ni / t)).ln();
        if nlnp > 0.0 {
            zplus += nlnp;
        } else {
            zminus -= nlnp;
        }
    }
    zplus - zminus
}

/// Ensemble likelihood of inclusive jet counts as a function of the coupling.
pub struct InclusiveJetLikelihood {
    config: LikelihoodConfig,
    data: Vec<f64>,
    lambda_range: (f64, f64),
    lambda: f64,
    kappa: Kappa,
    qcd: Vec<Box<dyn BaselineSpectrum>>,
    ci: Vec<Box<dyn CorrectionSpectrum>>,
    index: Vec<usize>,
    bins: BinRange,
    asimov: Option<Vec<f64>>,
    member: Option<usize>,
    cache: Option<LinearInterpolator>,
    underflow: f64,
    rng: StdRng,
}

impl std::fmt::Debug for InclusiveJetLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InclusiveJetLikelihood")
            .field("n_bins", &self.data.len())
            .field("members", &self.qcd.len())
            .field("lambda_range", &self.lambda_range)
            .field("lambda", &self.lambda)
            .field("kappa", &self.kappa)
            .field("bins", &self.bins)
            .field("asimov", &self.asimov.is_some())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl InclusiveJetLikelihood {
    /// Create from observed counts and the coupling range.
    pub fn new(counts: Vec<f64>, lambda_range: (f64, f64), config: LikelihoodConfig) -> Result<Self> {
        validate_counts(&counts)?;
        let (lo, hi) = lambda_range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(Error::Validation(format!("invalid coupling range [{lo}, {hi}]")));
        }
        if config.n_steps == 0 {
            return Err(Error::Validation("coupling cache needs at least one step".into()));
        }
        let bins = BinRange::full(counts.len());
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            data: counts,
            lambda_range,
            lambda: 0.0,
            kappa: Kappa::zero(),
            qcd: Vec::new(),
            ci: Vec::new(),
            index: Vec::new(),
            bins,
            asimov: None,
            member: None,
            cache: None,
            underflow: 0.0,
            rng,
        })
    }

    /// Reseed the bootstrap / pseudo-data generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Append an ensemble member.
    pub fn add<B, C>(&mut self, baseline: B, correction: C) -> Result<()>
    where
        B: BaselineSpectrum + 'static,
        C: CorrectionSpectrum + 'static,
    {
        let n = self.data.len();
        if baseline.n_bins() != n || correction.n_bins() != n {
            return Err(Error::Validation(format!(
                "member has {} baseline / {} correction bins, expected {}",
                baseline.n_bins(),
                correction.n_bins(),
                n
            )));
        }
        self.index.push(self.qcd.len());
        self.qcd.push(Box::new(baseline));
        self.ci.push(Box::new(correction));
        self.invalidate();
        Ok(())
    }

    /// Restrict the likelihood to 1-based inclusive bins `[first, last]`.
    ///
    /// Values are clamped; a non-positive `last` selects the last bin.
    pub fn set_bin_range(&mut self, first: i64, last: i64) {
        self.bins = BinRange::from_one_based(first, last, self.data.len());
        let (f, l) = self.bins.one_based();
        log::info!("InclusiveJetLikelihood: bin range [{f}, {l}]");
        self.invalidate();
    }

    /// Turn bootstrap resampling of the ensemble on or off.
    ///
    /// Enabled: `sample_count` (default: ensemble size) draws with replacement.
    /// Disabled: the identity index.
    pub fn bootstrap(&mut self, enable: bool, sample_count: Option<usize>) -> Result<()> {
        let size = self.qcd.len();
        self.index = if enable {
            toys::bootstrap_index(size, sample_count.unwrap_or(size), &mut self.rng)?
        } else {
            toys::identity_index(size)
        };
        log::debug!(
            "InclusiveJetLikelihood: bootstrap {} ({} index entries)",
            if enable { "on" } else { "off" },
            self.index.len()
        );
        self.invalidate();
        Ok(())
    }

    /// Switch between observed counts and Asimov pseudo-data.
    ///
    /// When enabled, sets the coupling to `lambda` and builds per-bin
    /// `luminosity * mean(baseline + correction)` over the index (`use_average`)
    /// or its first entry; `fluctuate` replaces each bin with a Poisson draw.
    pub fn set_asimov(
        &mut self,
        enable: bool,
        fluctuate: bool,
        luminosity: f64,
        lambda: f64,
        use_average: bool,
    ) -> Result<()> {
        self.invalidate();
        if !enable {
            self.asimov = None;
            return Ok(());
        }
        if self.index.is_empty() {
            return Err(Error::Validation("Asimov data needs at least one ensemble member".into()));
        }
        ensure_finite(luminosity, || "Asimov luminosity".into())?;
        ensure_finite(lambda, || "Asimov coupling".into())?;
        self.lambda = lambda;

        let members: Vec<usize> =
            if use_average { self.index.clone() } else { vec![self.index[0]] };
        let scale = luminosity / members.len() as f64;
        let mut expected = vec![0.0; self.data.len()];
        for &c in &members {
            for (bin, e) in expected.iter_mut().enumerate() {
                let mut v = self.qcd[c].value(bin);
                if lambda != 0.0 {
                    v += self.ci[c].value(lambda, &self.kappa, bin);
                }
                *e += v;
            }
        }
        for e in &mut expected {
            *e *= scale;
        }
        if fluctuate {
            expected = toys::poisson_from_expected(&expected, &mut self.rng);
        }
        self.asimov = Some(expected);
        Ok(())
    }

    /// Build the coupling cache.
    ///
    /// `member >= 0` selects that ensemble member; a negative value (or one past
    /// the ensemble) marginalizes over the index.
    pub fn initialize(&mut self, member: i64) -> Result<()> {
        self.cache = None;
        self.member = usize::try_from(member).ok().filter(|&c| c < self.qcd.len());
        let (lo, hi) = self.lambda_range;
        let xs = linspace_steps(lo, hi, self.config.n_steps);
        let ys = xs.iter().map(|&l| self.exact(l)).collect::<Result<Vec<_>>>()?;
        self.cache = Some(LinearInterpolator::new(xs, ys)?);
        log::debug!(
            "InclusiveJetLikelihood: cached {} points on [{lo}, {hi}] ({})",
            self.config.n_steps + 1,
            match self.member {
                Some(c) => format!("member {c}"),
                None => format!("marginal over {}", self.index.len()),
            }
        );
        Ok(())
    }

    /// Likelihood at the current coupling (cached when initialized).
    pub fn evaluate(&self) -> Result<f64> {
        self.density(self.lambda)
    }

    /// Exact likelihood at `lambda`, bypassing the cache.
    pub fn evaluate_at(&self, lambda: f64) -> Result<f64> {
        self.exact(lambda)
    }

    fn exact(&self, lambda: f64) -> Result<f64> {
        let n = self.counts_in_range();
        let value = match self.member {
            Some(c) => log_multinomial(&n, &self.expected_in_range(c, lambda)).exp(),
            None => {
                if self.index.is_empty() {
                    return Err(Error::Validation("likelihood has no ensemble members".into()));
                }
                self.index
                    .iter()
                    .map(|&c| log_multinomial(&n, &self.expected_in_range(c, lambda)).exp())
                    .sum::<f64>()
            }
        };
        let value = ensure_finite(value, || format!("likelihood at lambda = {lambda}"))?;
        Ok(value.max(0.0))
    }

    /// Profile log-likelihood: the best member's `log_multinomial` at `lambda`.
    ///
    /// With a single selected member its raw value is returned. Otherwise the
    /// maximum over the index is floored at the smallest representable log
    /// value, and the fraction of members below that floor is recorded (see
    /// [`InclusiveJetLikelihood::underflow_fraction`]).
    pub fn log_profile_likelihood(&mut self, lambda: f64) -> Result<f64> {
        let n = self.counts_in_range();
        if let Some(c) = self.member {
            self.underflow = 0.0;
            return self.member_log_likelihood(&n, c, lambda);
        }
        if self.index.is_empty() {
            return Err(Error::Validation("likelihood has no ensemble members".into()));
        }
        let smallest = f64::from_bits(1).ln();
        let mut best = smallest;
        let mut below = 0usize;
        for &c in &self.index {
            let lnl = self.member_log_likelihood(&n, c, lambda)?;
            if lnl < smallest {
                below += 1;
            }
            best = best.max(lnl);
        }
        self.underflow = below as f64 / self.index.len() as f64;
        Ok(best)
    }

    fn member_log_likelihood(&self, n: &[f64], c: usize, lambda: f64) -> Result<f64> {
        let lnl = log_multinomial(n, &self.expected_in_range(c, lambda));
        if lnl.is_nan() {
            return Err(Error::NumericFault(format!(
                "log-likelihood of member {c} at lambda = {lambda} is NaN"
            )));
        }
        Ok(lnl)
    }

    fn counts_in_range(&self) -> Vec<f64> {
        let counts = self.asimov.as_deref().unwrap_or(&self.data);
        counts[self.bins.first..=self.bins.last].to_vec()
    }

    fn expected_in_range(&self, c: usize, lambda: f64) -> Vec<f64> {
        self.bins
            .iter()
            .map(|bin| self.qcd[c].value(bin) + self.ci[c].value(lambda, &self.kappa, bin))
            .collect()
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Set the coupling. Does not invalidate the cache.
    pub fn set_lambda(&mut self, lambda: f64) {
        self.lambda = lambda;
    }

    /// Current coupling.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Coupling range of the cache.
    pub fn lambda_range(&self) -> (f64, f64) {
        self.lambda_range
    }

    /// Set the contact-interaction shape.
    pub fn set_kappa(&mut self, kappa: Kappa) {
        self.kappa = kappa;
        self.invalidate();
    }

    /// Current shape.
    pub fn kappa(&self) -> &Kappa {
        &self.kappa
    }

    /// Replace the observed counts.
    pub fn set_counts(&mut self, counts: Vec<f64>) -> Result<()> {
        validate_counts(&counts)?;
        if counts.len() != self.data.len() {
            return Err(Error::Validation(format!(
                "expected {} counts, got {}",
                self.data.len(),
                counts.len()
            )));
        }
        self.data = counts;
        self.invalidate();
        Ok(())
    }

    /// Observed counts.
    pub fn counts(&self) -> &[f64] {
        &self.data
    }

    /// Number of ensemble members.
    pub fn size(&self) -> usize {
        self.qcd.len()
    }

    /// Number of count bins.
    pub fn number_of_bins(&self) -> usize {
        self.data.len()
    }

    /// Baseline of member `c`.
    pub fn qcd(&self, c: usize) -> Option<&dyn BaselineSpectrum> {
        self.qcd.get(c).map(|b| b.as_ref())
    }

    /// Correction of member `c`.
    pub fn ci(&self, c: usize) -> Option<&dyn CorrectionSpectrum> {
        self.ci.get(c).map(|b| b.as_ref())
    }

    /// Per-bin baseline + correction of member `c` at the current coupling and
    /// shape; zeros when `c` is out of range.
    pub fn cross_section(&self, c: usize) -> Vec<f64> {
        let n = self.data.len();
        match (self.qcd.get(c), self.ci.get(c)) {
            (Some(q), Some(ci)) => {
                (0..n).map(|bin| q.value(bin) + ci.value(self.lambda, &self.kappa, bin)).collect()
            }
            _ => vec![0.0; n],
        }
    }

    /// Asimov counts, if enabled.
    pub fn asimov(&self) -> Option<&[f64]> {
        self.asimov.as_deref()
    }

    /// Ensemble index used for marginalization.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Active bin range.
    pub fn bin_range(&self) -> BinRange {
        self.bins
    }

    /// Whether the coupling cache is built.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Fraction of members that underflowed in the last
    /// [`InclusiveJetLikelihood::log_profile_likelihood`] call.
    pub fn underflow_fraction(&self) -> f64 {
        self.underflow
    }
}

impl Density for InclusiveJetLikelihood {
    fn density(&self, lambda: f64) -> Result<f64> {
        match &self.cache {
            Some(cache) => Ok(cache.eval(lambda)),
            None => self.exact(lambda),
        }
    }
}

fn validate_counts(counts: &[f64]) -> Result<()> {
    if counts.is_empty() {
        return Err(Error::Validation("no count bins".into()));
    }
    if let Some(i) = counts.iter().position(|c| !c.is_finite() || *c < 0.0) {
        return Err(Error::Validation(format!("count in bin {} is invalid: {}", i + 1, counts[i])));
    }
    Ok(())
}
