//! Common data types

use serde::{Deserialize, Serialize};

/// Length of the contact-interaction shape vector.
pub const KAPPA_LEN: usize = 6;

/// Contact-interaction shape (chirality) coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kappa(pub [f64; KAPPA_LEN]);

impl Kappa {
    /// Left-left, destructive.
    pub const LL: Kappa = Kappa([-1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    /// Right-right.
    pub const RR: Kappa = Kappa([0.0, 0.0, 0.0, 0.0, -1.0, 0.0]);
    /// Vector-vector.
    pub const VV: Kappa = Kappa([-1.0, 0.0, -2.0, 0.0, -1.0, 0.0]);
    /// Axial-axial.
    pub const AA: Kappa = Kappa([-1.0, 0.0, 2.0, 0.0, -1.0, 0.0]);
    /// V-A.
    pub const V_A: Kappa = Kappa([0.0, 0.0, -2.0, 0.0, 0.0, 0.0]);

    /// All-zero shape (no correction).
    pub const fn zero() -> Self {
        Kappa([0.0; KAPPA_LEN])
    }

    /// Look up a standard model by name (`"LL"`, `"RR"`, `"VV"`, `"AA"`, `"V-A"`).
    pub fn from_model_name(name: &str) -> Option<Self> {
        match name {
            "LL" => Some(Self::LL),
            "RR" => Some(Self::RR),
            "VV" => Some(Self::VV),
            "AA" => Some(Self::AA),
            "V-A" | "V_A" => Some(Self::V_A),
            _ => None,
        }
    }

    /// Coefficient `i`.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.0[i]
    }
}

/// Inclusive 0-based range of count bins used in the likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    /// First bin (0-based, inclusive).
    pub first: usize,
    /// Last bin (0-based, inclusive).
    pub last: usize,
}

impl BinRange {
    /// Full range over `n_bins` bins. `n_bins` must be at least 1.
    pub fn full(n_bins: usize) -> Self {
        Self { first: 0, last: n_bins.saturating_sub(1) }
    }

    /// Build from 1-based inclusive bin numbers, clamping into `[0, n_bins-1]`.
    ///
    /// A non-positive `last` selects the last bin; `first > last` collapses to `last`.
    pub fn from_one_based(first: i64, last: i64, n_bins: usize) -> Self {
        let top = n_bins.saturating_sub(1) as i64;
        let mut first = first - 1;
        let mut last = last - 1;
        first = first.clamp(0, top);
        if last < 0 || last > top {
            last = top;
        }
        if first > last {
            first = last;
        }
        Self { first: first as usize, last: last as usize }
    }

    /// Number of bins in the range.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always `false`; a range holds at least one bin.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the 0-based bin indices.
    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }

    /// 1-based (first, last), as reported to users.
    pub fn one_based(&self) -> (usize, usize) {
        (self.first + 1, self.last + 1)
    }
}

/// Maximum-a-posteriori estimate of the parameter of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEstimate {
    /// Posterior mode.
    pub poi: f64,
    /// Curvature-based uncertainty (`-ln p` rises by 0.5).
    pub uncertainty: f64,
    /// `-ln p` at the mode.
    pub nlp: f64,
    /// Minimizer convergence status.
    pub converged: bool,
    /// Minimizer iterations.
    pub n_iter: u64,
    /// Termination message.
    pub message: String,
}
