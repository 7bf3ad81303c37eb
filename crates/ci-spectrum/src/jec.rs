//! Jet-energy-scale uncertainty table.
//!
//! Regular (pT, eta) grid with nearest-cell lookup (no interpolation).
//! Outside the table the lookup returns a negative sentinel per violated edge.

use ci_core::{Error, Result, UncertaintyTable};

/// pT below the table.
pub const PT_BELOW: f64 = -1.0;
/// pT above the table.
pub const PT_ABOVE: f64 = -2.0;
/// eta below the table.
pub const ETA_BELOW: f64 = -3.0;
/// eta above the table.
pub const ETA_ABOVE: f64 = -4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    min: f64,
    max: f64,
    step: f64,
    n: usize,
}

impl Axis {
    fn new(name: &str, (min, max): (f64, f64), n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::Validation(format!("{name} axis needs at least one bin")));
        }
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(Error::Validation(format!("{name} axis range invalid: [{min}, {max}]")));
        }
        Ok(Self { min, max, step: (max - min) / n as f64, n })
    }

    /// 0-based cell index for an in-range coordinate; the upper edge maps to the last cell.
    fn cell(&self, v: f64) -> usize {
        (((v - self.min) / self.step) as usize).min(self.n - 1)
    }
}

/// Fractional jet-energy-scale uncertainty on a regular (pT, eta) grid.
#[derive(Debug, Clone)]
pub struct JecUncertainty {
    pt: Axis,
    eta: Axis,
    /// Row-major `[pt][eta]`.
    cells: Vec<f64>,
}

impl JecUncertainty {
    /// Build from axis ranges, bin counts and row-major `[pt][eta]` cell contents.
    pub fn new(
        pt_range: (f64, f64),
        n_pt: usize,
        eta_range: (f64, f64),
        n_eta: usize,
        cells: Vec<f64>,
    ) -> Result<Self> {
        let pt = Axis::new("pT", pt_range, n_pt)?;
        let eta = Axis::new("eta", eta_range, n_eta)?;
        if cells.len() != n_pt * n_eta {
            return Err(Error::Validation(format!(
                "JEC table expects {} cells ({} x {}), got {}",
                n_pt * n_eta,
                n_pt,
                n_eta,
                cells.len()
            )));
        }
        Ok(Self { pt, eta, cells })
    }

    /// Single-cell table with a constant uncertainty over the given domain.
    pub fn uniform(value: f64, pt_range: (f64, f64), eta_range: (f64, f64)) -> Result<Self> {
        Self::new(pt_range, 1, eta_range, 1, vec![value])
    }

    /// Lookup; see the module docs for the sentinel values.
    pub fn lookup(&self, pt: f64, eta: f64) -> f64 {
        if pt < self.pt.min {
            return PT_BELOW;
        }
        if pt > self.pt.max {
            return PT_ABOVE;
        }
        if eta < self.eta.min {
            return ETA_BELOW;
        }
        if eta > self.eta.max {
            return ETA_ABOVE;
        }
        self.cells[self.pt.cell(pt) * self.eta.n + self.eta.cell(eta)]
    }

    /// pT coverage.
    pub fn pt_range(&self) -> (f64, f64) {
        (self.pt.min, self.pt.max)
    }

    /// eta coverage.
    pub fn eta_range(&self) -> (f64, f64) {
        (self.eta.min, self.eta.max)
    }
}

impl UncertaintyTable for JecUncertainty {
    fn fractional_uncertainty(&self, pt: f64, eta: f64) -> f64 {
        self.lookup(pt, eta)
    }
}
