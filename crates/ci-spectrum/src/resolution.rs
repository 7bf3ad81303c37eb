//! Jet pT resolution parameterisations.
//!
//! `sigma(pT)` is an absolute width in GeV. The functional form is a
//! calibration input, so it sits behind [`ResolutionModel`].

/// Absolute jet pT resolution as a function of pT.
pub trait ResolutionModel {
    /// Width (GeV) of the response at true `pt`.
    fn sigma(&self, pt: f64) -> f64;
}

impl<T: ResolutionModel + ?Sized> ResolutionModel for Box<T> {
    fn sigma(&self, pt: f64) -> f64 {
        (**self).sigma(pt)
    }
}

/// Relative resolution term `sqrt(n|n|/x^2 + s^2 x^m + c^2)` (noise, stochastic, constant).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTerm {
    /// Noise.
    pub n: f64,
    /// Stochastic.
    pub s: f64,
    /// Stochastic exponent.
    pub m: f64,
    /// Constant.
    pub c: f64,
}

impl ResolutionTerm {
    /// Relative resolution at `x` (GeV).
    #[inline]
    pub fn relative(&self, x: f64) -> f64 {
        (self.n * self.n.abs() / (x * x) + self.s * self.s * x.powf(self.m) + self.c * self.c)
            .sqrt()
    }
}

/// Weighted quadrature sum of relative resolution terms (pile-up bins), times pT.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedQuadrature {
    terms: Vec<ResolutionTerm>,
    weights: Vec<f64>,
}

impl WeightedQuadrature {
    /// Build from matching terms and weights.
    pub fn new(terms: Vec<ResolutionTerm>, weights: Vec<f64>) -> ci_core::Result<Self> {
        if terms.is_empty() || terms.len() != weights.len() {
            return Err(ci_core::Error::Validation(format!(
                "resolution terms/weights mismatch: {} terms, {} weights",
                terms.len(),
                weights.len()
            )));
        }
        Ok(Self { terms, weights })
    }

    /// Relative resolution `sigma(pT)/pT`.
    pub fn relative(&self, pt: f64) -> f64 {
        self.terms
            .iter()
            .zip(self.weights.iter())
            .map(|(t, w)| w * t.relative(pt).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl Default for WeightedQuadrature {
    /// Central-rapidity (|y| < 0.5) resolution, five pile-up categories.
    fn default() -> Self {
        let term = |n, s, m, c| ResolutionTerm { n, s, m, c };
        Self {
            terms: vec![
                term(1.992, 0.5539, -0.7915, 0.02733),
                term(3.301, 0.6863, -0.8636, 0.02909),
                term(4.42, 0.7891, -0.9105, 0.03046),
                term(5.566, 0.8104, -0.9153, 0.03034),
                term(6.782, 0.8801, -0.9417, 0.03078),
            ],
            weights: vec![0.07858, 0.42870, 0.36185, 0.11092, 0.01995],
        }
    }
}

impl ResolutionModel for WeightedQuadrature {
    fn sigma(&self, pt: f64) -> f64 {
        pt * self.relative(pt)
    }
}

/// Empirical form `pT * (a + b / (pT^c + d pT))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmpPolynomial {
    /// Constant term.
    pub a: f64,
    /// Numerator of the falling term.
    pub b: f64,
    /// Power of pT in the denominator.
    pub c: f64,
    /// Linear coefficient in the denominator.
    pub d: f64,
}

impl Default for SmpPolynomial {
    fn default() -> Self {
        Self { a: 0.0257, b: 1.091, c: 0.5748, d: -0.002826 }
    }
}

impl ResolutionModel for SmpPolynomial {
    fn sigma(&self, pt: f64) -> f64 {
        pt * (self.a + self.b / (pt.powf(self.c) + self.d * pt))
    }
}

/// Fixed relative resolution `sigma = fraction * pT`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFraction(pub f64);

impl ResolutionModel for ConstantFraction {
    fn sigma(&self, pt: f64) -> f64 {
        self.0 * pt
    }
}
