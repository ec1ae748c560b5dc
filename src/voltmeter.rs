//! Active speech level measurement per ITU-T P.56 (method B).
//!
//! A [`VoltmeterState`] is fed successive blocks of normalized samples with
//! [`VoltmeterState::accumulate`] and read with [`VoltmeterState::estimate`].
//! Blocks must arrive in signal order: the envelope and the hangover counters
//! carry temporal history from one block into the next.

pub mod estimate;
pub mod interp;

pub use estimate::{Measurement, SignalStats};
pub use interp::{BracketEnd, Interpolation, bin_interp};

use crate::error::VoltmeterError;

/// Number of thresholds in the speech voltmeter.
pub const THRESHOLD_COUNT: usize = 15;
/// Envelope time constant, in seconds.
pub const ENVELOPE_TIME: f64 = 0.03;
/// Hangover duration, in seconds.
pub const HANGOVER_TIME: f64 = 0.20;
/// Margin between active level and threshold, in dB.
pub const MARGIN_DB: f64 = 15.9;
/// Added before taking logarithms so all-zero input stays finite.
pub const LOG_FLOOR: f64 = 1e-20;
/// 0 dB reference point: full scale (dBov).
pub const REFERENCE_DB: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct VoltmeterState {
    sample_rate: f64,
    /// Envelope pole, `exp(-1 / (fs * T))`.
    decay: f64,
    /// Hangover length in samples.
    hangover_len: u64,
    thresholds: [f64; THRESHOLD_COUNT],
    activity: [u64; THRESHOLD_COUNT],
    hangover: [u64; THRESHOLD_COUNT],
    sample_count: u64,
    sum: f64,
    sum_sq: f64,
    p: f64,
    q: f64,
    max_abs: f64,
    max_positive: f64,
    max_negative: f64,
}

impl VoltmeterState {
    pub fn new(sample_rate: f64) -> Result<Self, VoltmeterError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(VoltmeterError::InvalidSampleRate(sample_rate));
        }

        // Index 0 holds the lowest threshold (2^-15), index 14 the highest (0.5).
        let mut thresholds = [0.0; THRESHOLD_COUNT];
        let mut x = 0.5;
        for c in thresholds.iter_mut().rev() {
            *c = x;
            x /= 2.0;
        }

        let hangover_len = (HANGOVER_TIME * sample_rate + 0.5).floor() as u64;
        let mut state = Self {
            sample_rate,
            decay: (-1.0 / (sample_rate * ENVELOPE_TIME)).exp(),
            hangover_len,
            thresholds,
            activity: [0; THRESHOLD_COUNT],
            hangover: [0; THRESHOLD_COUNT],
            sample_count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            p: 0.0,
            q: 0.0,
            max_abs: 0.0,
            max_positive: f64::NEG_INFINITY,
            max_negative: f64::INFINITY,
        };
        state.reset();
        Ok(state)
    }

    /// Starts a new measurement session with the same sample rate.
    ///
    /// Hangover counters start expired, so no threshold counts as active
    /// until the envelope has crossed it at least once.
    pub fn reset(&mut self) {
        self.activity = [0; THRESHOLD_COUNT];
        self.hangover = [self.hangover_len; THRESHOLD_COUNT];
        self.sample_count = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
        self.p = 0.0;
        self.q = 0.0;
        self.max_abs = 0.0;
        self.max_positive = f64::NEG_INFINITY;
        self.max_negative = f64::INFINITY;
    }

    /// Processes one block of samples normalized to `[-1, 1]`.
    pub fn accumulate(&mut self, samples: &[f32]) {
        let g = self.decay;
        for &sample in samples {
            let x = f64::from(sample);
            let abs = x.abs();

            self.max_abs = self.max_abs.max(abs);
            self.max_positive = self.max_positive.max(x);
            self.max_negative = self.max_negative.min(x);

            // Process 1: long-term power
            self.sum_sq += x * x;
            self.sum += x;
            self.sample_count += 1;

            // Process 2: two-pole envelope, q smooths the already updated p
            self.p = g * self.p + (1.0 - g) * abs;
            self.q = g * self.q + (1.0 - g) * self.p;

            for j in 0..THRESHOLD_COUNT {
                if self.q >= self.thresholds[j] {
                    self.activity[j] += 1;
                    self.hangover[j] = 0;
                } else if self.hangover[j] < self.hangover_len {
                    self.activity[j] += 1;
                    self.hangover[j] += 1;
                }
            }
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn hangover_len(&self) -> u64 {
        self.hangover_len
    }

    pub fn thresholds(&self) -> &[f64; THRESHOLD_COUNT] {
        &self.thresholds
    }

    pub fn activity_counts(&self) -> &[u64; THRESHOLD_COUNT] {
        &self.activity
    }

    pub fn hangover_counts(&self) -> &[u64; THRESHOLD_COUNT] {
        &self.hangover
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.sum_sq
    }

    /// Current envelope value `q`.
    pub fn envelope(&self) -> f64 {
        self.q
    }

    /// Mean of all samples seen, 0 before the first sample.
    pub fn dc_level(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.sum / self.sample_count as f64
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    pub fn max_positive(&self) -> Option<f64> {
        (self.sample_count > 0).then_some(self.max_positive)
    }

    pub fn max_negative(&self) -> Option<f64> {
        (self.sample_count > 0).then_some(self.max_negative)
    }

    /// Long-term (RMS) level in dBov.
    pub fn long_term_level_db(&self) -> f64 {
        let mean_sq = if self.sample_count == 0 {
            0.0
        } else {
            self.sum_sq / self.sample_count as f64
        };
        10.0 * (mean_sq + LOG_FLOOR).log10() - REFERENCE_DB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sample_rate() {
        assert!(VoltmeterState::new(0.0).is_err());
        assert!(VoltmeterState::new(-8000.0).is_err());
        assert!(VoltmeterState::new(f64::NAN).is_err());
    }

    #[test]
    fn threshold_ladder_doubles_from_lowest() {
        let state = VoltmeterState::new(16000.0).unwrap();
        let c = state.thresholds();
        assert_eq!(c[THRESHOLD_COUNT - 1], 0.5);
        assert_eq!(c[0], 0.5 / f64::powi(2.0, 14));
        for pair in c.windows(2) {
            assert_eq!(pair[1], pair[0] * 2.0);
        }
    }

    #[test]
    fn hangover_length_is_rounded() {
        assert_eq!(VoltmeterState::new(16000.0).unwrap().hangover_len(), 3200);
        assert_eq!(VoltmeterState::new(8000.0).unwrap().hangover_len(), 1600);
        assert_eq!(VoltmeterState::new(11025.0).unwrap().hangover_len(), 2205);
    }

    #[test]
    fn empty_block_is_noop() {
        let mut state = VoltmeterState::new(16000.0).unwrap();
        state.accumulate(&[]);
        assert_eq!(state.sample_count(), 0);
        assert_eq!(state.max_positive(), None);
        assert_eq!(state.activity_counts(), &[0; THRESHOLD_COUNT]);
    }

    #[test]
    fn tracks_extremes_and_sums() {
        let mut state = VoltmeterState::new(8000.0).unwrap();
        state.accumulate(&[0.25, -0.5, 0.125]);
        assert_eq!(state.sample_count(), 3);
        assert_eq!(state.max_abs(), 0.5);
        assert_eq!(state.max_positive(), Some(0.25));
        assert_eq!(state.max_negative(), Some(-0.5));
        assert_eq!(state.sum_of_squares(), 0.0625 + 0.25 + 0.015625);
        assert!((state.dc_level() - (-0.125 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn hangover_keeps_threshold_active_after_drop() {
        let mut state = VoltmeterState::new(1000.0).unwrap();
        let hang = state.hangover_len();
        state.accumulate(&vec![1.0; 200]);
        let top = THRESHOLD_COUNT - 1;
        let before = state.activity_counts()[top];
        assert!(before > 0);

        // Envelope decays below 0.5 quickly but stays counted for the hangover.
        state.accumulate(&vec![0.0; 2 * hang as usize]);
        let after = state.activity_counts()[top];
        assert!(after > before + hang - 1);
        assert!(after <= before + 2 * hang);
        assert_eq!(state.hangover_counts()[top], hang);
    }

    #[test]
    fn split_blocks_match_single_block() {
        let signal: Vec<f32> = (0..4000)
            .map(|n| (n as f32 * 0.05).sin() * 0.3)
            .collect();

        let mut whole = VoltmeterState::new(16000.0).unwrap();
        whole.accumulate(&signal);

        let mut split = VoltmeterState::new(16000.0).unwrap();
        for block in signal.chunks(256) {
            split.accumulate(block);
        }

        assert_eq!(whole.activity_counts(), split.activity_counts());
        assert_eq!(whole.sample_count(), split.sample_count());
        assert_eq!(whole.envelope(), split.envelope());
    }

    #[test]
    fn reset_clears_session() {
        let mut state = VoltmeterState::new(16000.0).unwrap();
        state.accumulate(&[0.9; 1000]);
        state.reset();
        assert_eq!(state.sample_count(), 0);
        assert_eq!(state.activity_counts(), &[0; THRESHOLD_COUNT]);
        assert_eq!(state.envelope(), 0.0);
        assert_eq!(state.sample_rate(), 16000.0);
    }
}
