//! Human-readable summaries of an equalization run.

use std::io::{self, Write};

use crate::{
    config::Settings, equalizer::Outcome, output::samples_to_time, voltmeter::Measurement,
};

/// Peak-to-level ratio in dB, `None` for an all-zero signal.
pub fn peak_factor_db(max_abs: f64, level_db: f64) -> Option<f64> {
    (max_abs > 0.0).then(|| 20.0 * max_abs.log10() - level_db)
}

fn fmt_db(value: Option<f64>) -> String {
    value.map_or_else(|| "    n/a".to_string(), |v| format!("{v:7.3}"))
}

pub fn write_long<W: Write + ?Sized>(
    out: &mut W,
    settings: &Settings,
    outcome: &Outcome,
) -> io::Result<()> {
    let stats = outcome.measurement.stats();
    let full_scale = settings.format.full_scale();
    let active = outcome.measurement.active_level_db();
    let plan = &outcome.plan;

    writeln!(out, "---------------------------------------------------------")?;
    writeln!(
        out,
        "  Input file: ................... {}, {:2} bits, fs={:5.0} Hz",
        settings.input.display(),
        settings.format.resolution(),
        settings.sample_rate
    )?;
    writeln!(out, "  Block Length: ................. {:7} [samples]", plan.block_size)?;
    writeln!(out, "  Starting Block: ............... {:7} []", plan.first_block + 1)?;
    writeln!(out, "  Number of Blocks: ............. {:7} []", plan.block_count)?;
    writeln!(
        out,
        "  {} desired for output: {:7.3} [dBov]",
        outcome.level_source.label(),
        outcome.desired_level_db
    )?;
    writeln!(out, "  Norm factor desired is: ....... {:7.3} [times]", outcome.factor)?;
    match outcome.headroom {
        Some(h) => writeln!(
            out,
            "  Max norm WITHOUT saturation: .. {:7.3} [{:4.0} dB]",
            h,
            20.0 * h.log10()
        )?,
        None => writeln!(out, "  Max norm WITHOUT saturation: ..     n/a")?,
    }
    writeln!(out, "  DC level: ..................... {:7.0} [PCM]", stats.dc_level * full_scale)?;
    writeln!(
        out,
        "  Maximum positive value: ....... {:7.0} [PCM]",
        stats.max_positive * full_scale
    )?;
    writeln!(
        out,
        "  Maximum negative value: ....... {:7.0} [PCM]",
        stats.max_negative * full_scale
    )?;
    writeln!(
        out,
        "  Long term energy (rms): ....... {:7.3} [dBov]",
        stats.long_term_level_db
    )?;
    match active {
        Some(level) => writeln!(out, "  Active speech level: .......... {level:7.3} [dBov]")?,
        None => writeln!(out, "  Active speech level: ..........   silence")?,
    }
    writeln!(
        out,
        "  RMS peak-factor found: ........ {} [dB]",
        fmt_db(peak_factor_db(stats.max_abs, stats.long_term_level_db))
    )?;
    writeln!(
        out,
        "  Active peak factor found: ..... {} [dB]",
        fmt_db(active.and_then(|level| peak_factor_db(stats.max_abs, level)))
    )?;
    writeln!(
        out,
        "  Activity factor: .............. {:7.3} [%]",
        outcome.measurement.activity_factor() * 100.0
    )?;
    writeln!(
        out,
        "  Number of samples: ............ {:7} [{}]",
        stats.sample_count,
        samples_to_time(stats.sample_count, settings.sample_rate)
    )?;
    writeln!(out, "  Number of saturated samples: .. {:7}", outcome.saturated)?;
    writeln!(out, "  Output file: .................. {}", settings.output.display())?;
    writeln!(out, "---------------------------------------------------------")?;
    Ok(())
}

pub fn write_short<W: Write + ?Sized>(
    out: &mut W,
    settings: &Settings,
    outcome: &Outcome,
) -> io::Result<()> {
    let m: &Measurement = &outcome.measurement;
    let stats = m.stats();
    let full_scale = settings.format.full_scale();
    let active = m.active_level_db();

    writeln!(
        out,
        "{}: Samples: {:5} Min: {:6.0} Max: {:6.0} DC: {:7.2} RMSLev[dB]: {:7.3} ActLev[dB]: {} %Active: {:7.3} RMSPkF[dB]: {} ActPkF[dB]: {}",
        settings.input.display(),
        stats.sample_count,
        stats.max_negative * full_scale,
        stats.max_positive * full_scale,
        stats.dc_level * full_scale,
        stats.long_term_level_db,
        fmt_db(active),
        m.activity_factor() * 100.0,
        fmt_db(peak_factor_db(stats.max_abs, stats.long_term_level_db)),
        fmt_db(active.and_then(|level| peak_factor_db(stats.max_abs, level))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RawSettings,
        equalizer::Plan,
        gain::LevelSource,
        voltmeter::SignalStats,
    };

    fn fixture(measurement: Measurement) -> (Settings, Outcome) {
        let settings = Settings::validate(RawSettings::new("speech.raw", "speech.eq.raw")).unwrap();
        let outcome = Outcome {
            plan: Plan {
                block_size: 256,
                first_block: 0,
                block_count: 63,
                start_sample: 0,
                sample_count: 16000,
            },
            measurement,
            level_source: LevelSource::Active,
            desired_level_db: -26.0,
            measured_level_db: measurement.active_level_db(),
            factor: 0.5,
            headroom: Some(2.0),
            samples_written: 16000,
            saturated: 0,
        };
        (settings, outcome)
    }

    fn stats() -> SignalStats {
        SignalStats {
            sample_count: 16000,
            long_term_level_db: -23.0,
            dc_level: 0.0,
            max_abs: 0.5,
            max_positive: 0.5,
            max_negative: -0.25,
        }
    }

    #[test]
    fn peak_factor_of_silence_is_undefined() {
        assert_eq!(peak_factor_db(0.0, -200.0), None);
        let pf = peak_factor_db(0.5, -9.03).unwrap();
        assert!((pf - 3.01).abs() < 0.01);
    }

    #[test]
    fn long_summary_lists_levels() {
        let (settings, outcome) = fixture(Measurement::Active {
            active_level_db: -20.0,
            activity_factor: 0.5,
            stats: stats(),
        });
        let mut buf = Vec::new();
        write_long(&mut buf, &settings, &outcome).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("speech.raw, 16 bits, fs=16000 Hz"));
        assert!(text.contains("Active speech level: .......... -20.000 [dBov]"));
        assert!(text.contains("Activity factor: ..............  50.000 [%]"));
        assert!(text.contains("Maximum negative value: .......   -8192 [PCM]"));
        assert!(text.contains("00:00:01.000"));
    }

    #[test]
    fn summaries_mark_silence() {
        let (settings, outcome) = fixture(Measurement::Silence { stats: stats() });
        let mut long = Vec::new();
        write_long(&mut long, &settings, &outcome).unwrap();
        assert!(String::from_utf8(long).unwrap().contains("silence"));

        let mut short = Vec::new();
        write_short(&mut short, &settings, &outcome).unwrap();
        let line = String::from_utf8(short).unwrap();
        assert!(line.starts_with("speech.raw: Samples: 16000"));
        assert!(line.contains("ActLev[dB]:     n/a"));
        assert_eq!(line.lines().count(), 1);
    }
}
