use serde::Serialize;
use tracing::warn;

use super::{
    LOG_FLOOR, MARGIN_DB, REFERENCE_DB, THRESHOLD_COUNT, VoltmeterState,
    interp::{BracketEnd, bin_interp},
};
use crate::error::VoltmeterError;

/// Tolerance of the threshold interpolation, in dB.
pub const INTERP_TOLERANCE_DB: f64 = 0.5;

/// Whole-signal statistics available whether or not speech was found.
/// Amplitudes are in the normalized `[-1, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalStats {
    pub sample_count: u64,
    pub long_term_level_db: f64,
    pub dc_level: f64,
    pub max_abs: f64,
    pub max_positive: f64,
    pub max_negative: f64,
}

/// Result of [`VoltmeterState::estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Measurement {
    #[serde(rename_all = "camelCase")]
    Active {
        active_level_db: f64,
        activity_factor: f64,
        stats: SignalStats,
    },
    /// The envelope never cleared the detectability margin, or no threshold
    /// it reached came within it.
    Silence { stats: SignalStats },
}

impl Measurement {
    pub fn stats(&self) -> &SignalStats {
        match self {
            Measurement::Active { stats, .. } | Measurement::Silence { stats } => stats,
        }
    }

    pub fn active_level_db(&self) -> Option<f64> {
        match self {
            Measurement::Active {
                active_level_db, ..
            } => Some(*active_level_db),
            Measurement::Silence { .. } => None,
        }
    }

    /// Fraction of signal power in active segments; 0 for silence.
    pub fn activity_factor(&self) -> f64 {
        match self {
            Measurement::Active {
                activity_factor, ..
            } => *activity_factor,
            Measurement::Silence { .. } => 0.0,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, Measurement::Silence { .. })
    }
}

impl VoltmeterState {
    /// Active speech level of everything accumulated so far.
    ///
    /// Only reads the state, so it may be called between blocks to obtain a
    /// running estimate.
    pub fn estimate(&self) -> Result<Measurement, VoltmeterError> {
        let long_term_level_db = self.long_term_level_db();
        let stats = SignalStats {
            sample_count: self.sample_count,
            long_term_level_db,
            dc_level: self.dc_level(),
            max_abs: self.max_abs,
            max_positive: self.max_positive().unwrap_or(0.0),
            max_negative: self.max_negative().unwrap_or(0.0),
        };

        let activity = &self.activity;
        if activity[0] == 0 {
            return Ok(Measurement::Silence { stats });
        }

        let lowest = self.bracket_end(0);
        if lowest.excess(MARGIN_DB) < 0.0 {
            return Ok(Measurement::Silence { stats });
        }

        let mut highest_active = 0;
        for j in 1..THRESHOLD_COUNT {
            if activity[j] == 0 {
                continue;
            }
            highest_active = j;

            let upper = self.bracket_end(j);
            if upper.excess(MARGIN_DB) <= 0.0 {
                let lower = self.bracket_end(j - 1);
                let interp = bin_interp(upper, lower, MARGIN_DB, INTERP_TOLERANCE_DB)?;
                let active_level_db = interp.level_db;
                let activity_factor = 10f64.powf((long_term_level_db - active_level_db) / 10.0);

                return Ok(Measurement::Active {
                    active_level_db: active_level_db - REFERENCE_DB,
                    activity_factor,
                    stats,
                });
            }
        }

        // Impulsive input: the envelope is never busy enough at any
        // reached threshold to come within the margin.
        warn!(
            highest_active,
            "no threshold brackets the active level; treating input as silence"
        );
        Ok(Measurement::Silence { stats })
    }

    /// Activity-normalized level and threshold level of threshold `j`, in dB.
    fn bracket_end(&self, j: usize) -> BracketEnd {
        BracketEnd {
            level_db: 10.0 * (self.sum_sq / self.activity[j] as f64 + LOG_FLOOR).log10(),
            threshold_db: 20.0 * self.thresholds[j].log10(),
        }
    }
}
