//! # ci-inference
//!
//! Statistical inference on a contact-interaction coupling from inclusive jet
//! counts.
//!
//! This crate provides:
//! - [`InclusiveJetLikelihood`]: multinomial likelihood marginalized (or
//!   profiled) over a spectrum ensemble, with bootstrap and Asimov data
//! - [`Bayes`]: posterior normalization, CDF, credible limits and MAP estimate
//!   over any [`ci_core::Density`]
//!
//! ## Typical flow
//!
//! Build the ensemble, optionally restrict bins and select Asimov/bootstrap
//! mode, call [`InclusiveJetLikelihood::initialize`], then hand the model to
//! [`Bayes`] and ask for a percentile.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Posterior engine.
pub mod bayes;
/// Ensemble likelihood of jet counts.
pub mod likelihood;
/// Bounded scalar minimization (L-BFGS backend).
pub mod optimizer;
/// Bracketed root finding (Brent backend).
pub mod roots;
/// Pseudo-data and bootstrap helpers.
pub mod toys;

pub use bayes::{Bayes, BayesConfig};
pub use likelihood::{InclusiveJetLikelihood, LikelihoodConfig, log_multinomial};
pub use optimizer::{LbfgsOptimizer, ObjectiveFunction, OptimizationResult, OptimizerConfig};
pub use roots::brent_root;
