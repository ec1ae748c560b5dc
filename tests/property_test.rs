//! Property-based tests for the PCM codec and the threshold interpolation.

use proptest::prelude::*;
use sv56::{
    pcm::SampleFormat,
    voltmeter::{BracketEnd, VoltmeterState, bin_interp, interp::MAX_ITERATIONS},
};

const MARGIN: f64 = 15.9;

proptest! {
    /// Property: dequantize then quantize at the same resolution is lossless
    #[test]
    fn quantize_round_trip(resolution in 2u32..=24, seed in any::<u32>()) {
        let format = SampleFormat::new(resolution).unwrap();
        let (min, max) = (format.min_value(), format.max_value());
        let span = (max as i64 - min as i64 + 1) as u64;
        let values: Vec<i32> = (0..64u64)
            .map(|k| (min as i64 + ((seed as u64).wrapping_mul(2_654_435_761).wrapping_add(k * 40_503) % span) as i64) as i32)
            .chain([min, max, 0, -1])
            .collect();

        let mut floats = Vec::new();
        format.dequantize(&values, &mut floats);
        let mut back = Vec::new();
        let saturated = format.quantize(&floats, &mut back);

        prop_assert_eq!(saturated, 0);
        prop_assert_eq!(back, values);
    }

    /// Property: quantized output always lies in the representable range
    #[test]
    fn quantize_stays_in_range(
        resolution in 2u32..=24,
        samples in prop::collection::vec(-4.0f32..4.0, 1..200)
    ) {
        let format = SampleFormat::new(resolution).unwrap();
        let mut out = Vec::new();
        format.quantize(&samples, &mut out);
        prop_assert!(out.iter().all(|&v| v >= format.min_value() && v <= format.max_value()));
    }

    /// Property: any valid bracket resolves within two passes
    #[test]
    fn bin_interp_terminates(
        upper_level in -80.0f64..0.0,
        lower_level in -80.0f64..0.0,
        upper_excess in -30.0f64..-0.01,
        lower_excess in 0.01f64..30.0,
        tolerance in 0.0001f64..2.0,
    ) {
        let upper = BracketEnd { level_db: upper_level, threshold_db: upper_level - MARGIN - upper_excess };
        let lower = BracketEnd { level_db: lower_level, threshold_db: lower_level - MARGIN - lower_excess };
        let r = bin_interp(upper, lower, MARGIN, tolerance).unwrap();

        prop_assert!(r.iterations <= 2 * MAX_ITERATIONS);
        let lo = upper_level.min(lower_level);
        let hi = upper_level.max(lower_level);
        prop_assert!(r.level_db >= lo && r.level_db <= hi);
    }

    /// Property: a satisfying endpoint comes back unchanged
    #[test]
    fn bin_interp_accepts_satisfying_endpoint(
        level in -80.0f64..0.0,
        offset in -0.4f64..0.4,
        other_excess in 1.0f64..20.0,
    ) {
        let upper = BracketEnd { level_db: level, threshold_db: level - MARGIN - offset };
        let lower = BracketEnd { level_db: level + 3.0, threshold_db: level + 3.0 - MARGIN - other_excess };
        let r = bin_interp(upper, lower, MARGIN, 0.5).unwrap();
        prop_assert_eq!(r.level_db, level);
        prop_assert_eq!(r.iterations, 0);
    }

    /// Property: estimating never fails or produces NaN on bounded input
    #[test]
    fn estimate_is_finite(samples in prop::collection::vec(-1.0f32..1.0, 1..4000)) {
        let mut state = VoltmeterState::new(8000.0).unwrap();
        state.accumulate(&samples);
        let m = state.estimate();
        prop_assert!(m.is_ok(), "estimate failed: {:?}", m);
        let m = m.unwrap();
        prop_assert!(m.stats().long_term_level_db.is_finite());
        if let Some(level) = m.active_level_db() {
            prop_assert!(level.is_finite());
            prop_assert!(m.activity_factor() > 0.0);
        }
    }

    /// Property: mostly-zero input with a few full-scale spikes still yields
    /// a measurement
    #[test]
    fn estimate_handles_sparse_spikes(
        len in 1000usize..32000,
        spikes in prop::collection::vec((0usize..32000, any::<bool>()), 0..12),
    ) {
        let mut samples = vec![0.0f32; len];
        for (pos, positive) in spikes {
            samples[pos % len] = if positive { 1.0 } else { -1.0 };
        }
        let mut state = VoltmeterState::new(16000.0).unwrap();
        state.accumulate(&samples);
        let m = state.estimate();
        prop_assert!(m.is_ok(), "estimate failed: {:?}", m);
        let m = m.unwrap();
        if let Some(level) = m.active_level_db() {
            prop_assert!(level.is_finite());
        }
    }
}
