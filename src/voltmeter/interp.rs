//! Bisection between two adjacent thresholds for the level at which
//! `(activity level - threshold level) == margin`.

use crate::error::VoltmeterError;

/// Iterations allowed per pass before the tolerance is relaxed.
pub const MAX_ITERATIONS: u32 = 20;
/// Factor applied to the tolerance after an unconverged pass.
pub const TOLERANCE_RELAXATION: f64 = 10.0;
/// Passes run in total: the strict one plus one relaxed pass.
const PASSES: u32 = 2;

/// One end of a threshold bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketEnd {
    /// Activity-normalized signal level, dB.
    pub level_db: f64,
    /// Threshold level, dB.
    pub threshold_db: f64,
}

impl BracketEnd {
    /// Distance from the margin condition; zero at the active level.
    pub fn excess(&self, margin: f64) -> f64 {
        (self.level_db - self.threshold_db) - margin
    }

    fn midpoint(&self, other: &BracketEnd) -> BracketEnd {
        BracketEnd {
            level_db: (self.level_db + other.level_db) / 2.0,
            threshold_db: (self.threshold_db + other.threshold_db) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolation {
    pub level_db: f64,
    /// Midpoints evaluated, 0 when an endpoint was accepted directly.
    pub iterations: u32,
    /// Tolerance the result actually met.
    pub tolerance: f64,
    pub relaxed: bool,
}

/// Finds the level between `upper` and `lower` where the excess over
/// `margin` vanishes, within `tolerance` dB.
///
/// The two ends must have excesses of opposite sign. After
/// [`MAX_ITERATIONS`] midpoints without meeting the tolerance it is
/// multiplied by [`TOLERANCE_RELAXATION`] and the search continues for one
/// more pass; if that fails too the error is returned rather than an
/// unconverged value.
pub fn bin_interp(
    upper: BracketEnd,
    lower: BracketEnd,
    margin: f64,
    tolerance: f64,
) -> Result<Interpolation, VoltmeterError> {
    let mut tol = tolerance.abs();
    let mut upper_excess = upper.excess(margin);
    let lower_excess = lower.excess(margin);

    let accept = |level_db, tol| Interpolation {
        level_db,
        iterations: 0,
        tolerance: tol,
        relaxed: false,
    };
    if upper_excess.abs() < tol || upper_excess == 0.0 {
        return Ok(accept(upper.level_db, tol));
    }
    if lower_excess.abs() < tol || lower_excess == 0.0 {
        return Ok(accept(lower.level_db, tol));
    }

    // Also rejects NaN ends.
    if !(upper_excess * lower_excess < 0.0) {
        return Err(VoltmeterError::InvalidBracket {
            upper_excess,
            lower_excess,
        });
    }

    let (mut up, mut lw) = (upper, lower);
    let mut iterations = 0;
    for pass in 0..PASSES {
        for _ in 0..MAX_ITERATIONS {
            let mid = up.midpoint(&lw);
            let diff = mid.excess(margin);
            iterations += 1;

            if diff.abs() <= tol {
                return Ok(Interpolation {
                    level_db: mid.level_db,
                    iterations,
                    tolerance: tol,
                    relaxed: pass > 0,
                });
            }

            if (diff > 0.0) == (upper_excess > 0.0) {
                up = mid;
                upper_excess = diff;
            } else {
                lw = mid;
            }
        }

        tol *= TOLERANCE_RELAXATION;
        tracing::debug!(tolerance = tol, "relaxing interpolation tolerance");
    }

    Err(VoltmeterError::NoConvergence {
        tolerance: tol / TOLERANCE_RELAXATION,
        iterations,
    })
}
