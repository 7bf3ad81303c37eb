//! Globally adaptive Gauss–Kronrod (7/15) integration.
//!
//! The interval with the largest error estimate is bisected until the summed
//! error is below `max(abs_tol, rel_tol * |I|)` or the interval budget is spent.
//! Running out of intervals is not an error: the best estimate is returned and
//! the shortfall is logged.

use ci_core::{Error, Result};

/// Kronrod abscissae on [0, 1] (descending); odd indices are the Gauss nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

/// 7-point Gauss weights (nodes `XGK[1]`, `XGK[3]`, `XGK[5]`, centre).
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Result of an adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadResult {
    /// Integral estimate.
    pub value: f64,
    /// Summed absolute error estimate.
    pub abs_error: f64,
    /// Number of sub-intervals used.
    pub n_intervals: usize,
    /// Whether the requested tolerance was met.
    pub converged: bool,
}

/// Adaptive integrator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    /// Relative tolerance.
    pub rel_tol: f64,
    /// Absolute tolerance.
    pub abs_tol: f64,
    /// Maximum number of sub-intervals.
    pub max_intervals: usize,
}

impl Default for Integrator {
    fn default() -> Self {
        Self { rel_tol: 1e-4, abs_tol: 0.0, max_intervals: 200 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl Integrator {
    /// Relative-tolerance-only integrator.
    pub fn with_rel_tol(rel_tol: f64) -> Self {
        Self { rel_tol, ..Self::default() }
    }

    /// Set the absolute tolerance.
    pub fn abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    /// Integrate `f` over `[a, b]`, returning only the estimate.
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<f64>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        Ok(self.integrate_full(f, a, b)?.value)
    }

    /// Integrate `f` over `[a, b]`.
    ///
    /// Errors from `f` are propagated; a non-finite integrand value is a
    /// [`Error::NumericFault`].
    pub fn integrate_full<F>(&self, mut f: F, a: f64, b: f64) -> Result<QuadResult>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        if !(a.is_finite() && b.is_finite()) {
            return Err(Error::Validation(format!(
                "integration bounds must be finite, got [{a}, {b}]"
            )));
        }
        if a == b {
            return Ok(QuadResult { value: 0.0, abs_error: 0.0, n_intervals: 0, converged: true });
        }
        if a > b {
            let r = self.integrate_full(f, b, a)?;
            return Ok(QuadResult { value: -r.value, ..r });
        }

        let first = gk15(&mut f, a, b)?;
        let mut segments = vec![first];
        let max_intervals = self.max_intervals.max(1);

        loop {
            let total: f64 = segments.iter().map(|s| s.value).sum();
            let error: f64 = segments.iter().map(|s| s.error).sum();
            let tol = self.abs_tol.max(self.rel_tol * total.abs());
            if error <= tol {
                return Ok(QuadResult {
                    value: total,
                    abs_error: error,
                    n_intervals: segments.len(),
                    converged: true,
                });
            }
            if segments.len() >= max_intervals {
                log::warn!(
                    "quad: interval budget ({max_intervals}) exhausted on [{a}, {b}]; \
                     estimate={total:.6e}, error={error:.3e}, tol={tol:.3e}"
                );
                return Ok(QuadResult {
                    value: total,
                    abs_error: error,
                    n_intervals: segments.len(),
                    converged: false,
                });
            }

            let (worst, _) = segments
                .iter()
                .enumerate()
                .max_by(|x, y| x.1.error.total_cmp(&y.1.error))
                .ok_or_else(|| Error::Computation("quad: empty segment list".into()))?;
            let seg = segments.swap_remove(worst);
            let mid = 0.5 * (seg.a + seg.b);
            if mid <= seg.a || mid >= seg.b {
                // Interval can no longer be split in floating point.
                log::warn!("quad: interval [{}, {}] cannot be bisected further", seg.a, seg.b);
                segments.push(Segment { error: 0.0, ..seg });
                continue;
            }
            segments.push(gk15(&mut f, seg.a, mid)?);
            segments.push(gk15(&mut f, mid, seg.b)?);
        }
    }
}

fn eval_checked<F>(f: &mut F, x: f64) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let y = f(x)?;
    if !y.is_finite() {
        return Err(Error::NumericFault(format!("integrand is {y} at x = {x}")));
    }
    Ok(y)
}

fn gk15<F>(f: &mut F, a: f64, b: f64) -> Result<Segment>
where
    F: FnMut(f64) -> Result<f64>,
{
    let centre = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = eval_checked(f, centre)?;
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;

    for (j, (&x, &w)) in XGK.iter().zip(WGK.iter()).take(7).enumerate() {
        let dx = half * x;
        let pair = eval_checked(f, centre - dx)? + eval_checked(f, centre + dx)?;
        kronrod += w * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Ok(Segment { a, b, value: kronrod * half, error: ((kronrod - gauss) * half).abs() })
}
