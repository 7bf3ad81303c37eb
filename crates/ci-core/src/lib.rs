//! # ci-core
//!
//! Shared foundation for the contact-interaction limit workspace:
//! - [`Error`] / [`Result`]
//! - the [`Density`] capability plugged into the posterior engine
//! - the spectrum-side traits consumed by the likelihood model
//! - small shared types ([`BinRange`], [`Kappa`], [`MapEstimate`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result, ensure_finite};
pub use traits::{
    BaselineSpectrum, CorrectionSpectrum, Density, FlatPrior, FnDensity, UncertaintyTable,
};
pub use types::{BinRange, KAPPA_LEN, Kappa, MapEstimate};
