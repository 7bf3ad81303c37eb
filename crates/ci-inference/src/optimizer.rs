//! Bounded one-dimensional minimization
//!
//! Thin wrapper around argmin's L-BFGS with a More-Thuente line search. The
//! interval is mapped onto `[0, 1]` and bounds are enforced by clamping; the
//! gradient is a central difference with a caller-chosen step.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ci_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Configuration for the L-BFGS minimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Maximum number of iterations
    pub max_iter: u64,
    /// Convergence tolerance for the gradient norm
    pub tol: f64,
    /// Number of stored corrections
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iter: 10_000, tol: 1e-5, m: 7 }
    }
}

/// Result of a minimization
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Location of the minimum
    pub x: f64,
    /// Function value at the minimum
    pub fval: f64,
    /// Number of iterations
    pub n_iter: u64,
    /// Number of objective evaluations
    pub n_fev: usize,
    /// Number of gradient evaluations
    pub n_gev: usize,
    /// Convergence status
    pub converged: bool,
    /// Termination message
    pub message: String,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OptimizationResult(x={:.6e}, fval={:.6}, n_iter={}, n_fev={}, n_gev={}, converged={})",
            self.x, self.fval, self.n_iter, self.n_fev, self.n_gev, self.converged
        )
    }
}

/// Scalar objective
pub trait ObjectiveFunction {
    /// Evaluate at `x`.
    fn eval(&self, x: f64) -> Result<f64>;

    /// Finite-difference step at `x`.
    fn step(&self, x: f64) -> f64 {
        1e-8 * x.abs().max(1.0)
    }

    /// Derivative at `x` (central difference unless overridden).
    fn derivative(&self, x: f64) -> Result<f64> {
        let h = self.step(x);
        let f_plus = self.eval(x + h)?;
        let f_minus = self.eval(x - h)?;
        Ok((f_plus - f_minus) / (2.0 * h))
    }

    /// Second derivative at `x` from a central second difference.
    fn curvature(&self, x: f64) -> Result<f64> {
        let h = self.step(x);
        let f0 = self.eval(x)?;
        let f_plus = self.eval(x + h)?;
        let f_minus = self.eval(x - h)?;
        Ok((f_plus - 2.0 * f0 + f_minus) / (h * h))
    }
}

#[derive(Default)]
struct FuncCounts {
    cost: Cell<usize>,
    grad: Cell<usize>,
}

/// Adapter exposing an [`ObjectiveFunction`] to argmin.
///
/// argmin works in the unit coordinate `u = (x - lo) / (hi - lo)`, clamped to `[0, 1]`.
struct ArgminProblem<'a> {
    objective: &'a dyn ObjectiveFunction,
    bounds: (f64, f64),
    counts: &'a FuncCounts,
}

impl ArgminProblem<'_> {
    fn width(&self) -> f64 {
        self.bounds.1 - self.bounds.0
    }

    fn to_x(&self, u: f64) -> f64 {
        (self.bounds.0 + u.clamp(0.0, 1.0) * self.width()).clamp(self.bounds.0, self.bounds.1)
    }

    fn to_u(&self, x: f64) -> f64 {
        ((x - self.bounds.0) / self.width()).clamp(0.0, 1.0)
    }

    fn x_of(&self, params: &[f64]) -> Result<f64> {
        params
            .first()
            .map(|&u| self.to_x(u))
            .ok_or_else(|| Error::Validation("empty parameter vector".into()))
    }
}

fn to_argmin(e: Error) -> argmin::core::Error {
    argmin::core::Error::msg(e.to_string())
}

impl CostFunction for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        self.counts.cost.set(self.counts.cost.get() + 1);
        let x = self.x_of(params).map_err(to_argmin)?;
        self.objective.eval(x).map_err(to_argmin)
    }
}

impl Gradient for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        self.counts.grad.set(self.counts.grad.get() + 1);
        let x = self.x_of(params).map_err(to_argmin)?;
        let (lo, hi) = self.bounds;
        // Keep the difference stencil inside the domain.
        let h = self.objective.step(x).min(0.25 * self.width());
        let xs = x.clamp(lo + h, hi - h);
        let mut g = self.objective.derivative(xs).map_err(to_argmin)? * self.width();

        // At a bound with the gradient pointing outward, stop pushing.
        const EPS: f64 = 1e-12;
        let u = self.to_u(x);
        if (u <= EPS && g > 0.0) || (u >= 1.0 - EPS && g < 0.0) {
            g = 0.0;
        }
        Ok(vec![g])
    }
}

/// L-BFGS minimizer over a closed interval
#[derive(Debug, Clone, Default)]
pub struct LbfgsOptimizer {
    config: OptimizerConfig,
}

impl LbfgsOptimizer {
    /// Create a minimizer with the given configuration
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` on `[bounds.0, bounds.1]` starting from `init`.
    pub fn minimize(
        &self,
        objective: &dyn ObjectiveFunction,
        init: f64,
        bounds: (f64, f64),
    ) -> Result<OptimizationResult> {
        let (lo, hi) = bounds;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(Error::Validation(format!("invalid bounds [{lo}, {hi}]")));
        }
        if !init.is_finite() {
            return Err(Error::Validation(format!("invalid starting point {init}")));
        }

        let counts = FuncCounts::default();
        let problem = ArgminProblem { objective, bounds, counts: &counts };
        let u0 = problem.to_u(init);

        let linesearch = MoreThuenteLineSearch::new();
        let tol_cost = if self.config.tol == 0.0 { 0.0 } else { (0.1 * self.config.tol).max(1e-12) };
        let solver = LBFGS::new(linesearch, self.config.m)
            .with_tolerance_grad(self.config.tol)
            .map_err(|e| Error::Validation(format!("invalid optimizer configuration (tol): {e}")))?
            .with_tolerance_cost(tol_cost)
            .map_err(|e| {
                Error::Validation(format!("invalid optimizer configuration (tol_cost): {e}"))
            })?;

        let res = Executor::new(problem, solver)
            .configure(|state| state.param(vec![u0]).max_iters(self.config.max_iter))
            .run()
            .map_err(|e| Error::NonConvergence(format!("minimization failed: {e}")))?;

        let state = res.state();
        let u = state
            .get_best_param()
            .and_then(|p| p.first().copied())
            .ok_or_else(|| Error::NonConvergence("no best parameter found".into()))?;
        let x = lo + u.clamp(0.0, 1.0) * (hi - lo);
        let fval = state.get_best_cost();
        let n_iter = state.get_iter();

        let termination = state.get_termination_status();
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );
        let message = termination.to_string();

        Ok(OptimizationResult {
            x,
            fval,
            n_iter,
            n_fev: counts.cost.get(),
            n_gev: counts.grad.get(),
            converged,
            message,
        })
    }
}
