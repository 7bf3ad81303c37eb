//! Bracketed scalar root finding (argmin's Brent solver).

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::brent::BrentRoot;
use ci_core::{Error, Result};

/// Iteration cap for the root finder.
pub const MAX_ROOT_ITER: u64 = 100;

struct RootProblem<F> {
    f: F,
}

impl<F> CostFunction for RootProblem<F>
where
    F: Fn(f64) -> Result<f64>,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &f64) -> std::result::Result<f64, argmin::core::Error> {
        (self.f)(*x).map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

/// Find a root of `f` in `[lo, hi]` to absolute tolerance `tol`.
///
/// `f(lo)` and `f(hi)` must not have the same sign. A failed bracket, an error
/// from `f` or hitting the iteration cap all give [`Error::NonConvergence`].
pub fn brent_root<F>(f: F, lo: f64, hi: f64, tol: f64) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(Error::Validation(format!("invalid root bracket [{lo}, {hi}]")));
    }
    let solver = BrentRoot::new(lo, hi, tol);
    let res = Executor::new(RootProblem { f }, solver)
        .configure(|state| state.max_iters(MAX_ROOT_ITER))
        .run()
        .map_err(|e| Error::NonConvergence(format!("root finding on [{lo}, {hi}]: {e}")))?;

    let state = res.state();
    let status = state.get_termination_status();
    if !matches!(status, TerminationStatus::Terminated(TerminationReason::SolverConverged)) {
        return Err(Error::NonConvergence(format!(
            "root finding on [{lo}, {hi}] stopped: {status}"
        )));
    }
    state
        .get_param()
        .copied()
        .ok_or_else(|| Error::NonConvergence("root finder returned no parameter".into()))
}
