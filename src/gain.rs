use serde::Serialize;

use crate::voltmeter::Measurement;

/// Which measured level the equalization factor is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelSource {
    #[default]
    Active,
    /// Long-term RMS level of the whole range.
    LongTerm,
}

impl LevelSource {
    pub fn label(&self) -> &'static str {
        match self {
            LevelSource::Active => "Active speech level",
            LevelSource::LongTerm => "RMS level",
        }
    }
}

/// Level to equalize from, or `None` when the active level was requested
/// and the measurement found only silence.
pub fn select_level(measurement: &Measurement, source: LevelSource) -> Option<f64> {
    match source {
        LevelSource::Active => measurement.active_level_db(),
        LevelSource::LongTerm => Some(measurement.stats().long_term_level_db),
    }
}

/// Linear factor taking `measured_db` to `desired_db`.
pub fn compute_gain(measured_db: f64, desired_db: f64) -> f64 {
    10f64.powf((desired_db - measured_db) / 20.0)
}

/// Largest factor that keeps a peak of `max_abs` within full scale.
pub fn headroom_gain(max_abs: f64) -> Option<f64> {
    (max_abs > 0.0).then(|| 1.0 / max_abs)
}

/// Scaled copy of `samples`. No clipping happens here.
pub fn apply_gain(samples: &[f32], factor: f64) -> Vec<f32> {
    let mut out = samples.to_vec();
    apply_gain_in_place(&mut out, factor);
    out
}

/// Scales in single precision.
pub fn apply_gain_in_place(samples: &mut [f32], factor: f64) {
    let factor = factor as f32;
    for sample in samples.iter_mut() {
        *sample *= factor;
    }
}
