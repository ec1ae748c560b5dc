//! Two passes over the selected blocks: measure the level, then rescale
//! every sample by the equalization factor and write it out.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, Write},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{BlockRange, Settings},
    error::{Error, Result},
    gain::{LevelSource, apply_gain_in_place, compute_gain, headroom_gain, select_level},
    output::Output,
    pcm::{PcmReader, PcmWriter, SampleFormat},
    voltmeter::{Measurement, VoltmeterState},
};

/// The part of the input actually processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub block_size: usize,
    /// 0-based.
    pub first_block: u64,
    pub block_count: u64,
    pub start_sample: u64,
    pub sample_count: u64,
}

impl Plan {
    /// Fits `blocks` to an input of `total_samples`. A trailing partial block
    /// is included; a start at or past the end is a seek error.
    pub fn new(total_samples: u64, blocks: &BlockRange) -> Result<Self> {
        let start_sample = blocks.start_sample();
        if start_sample >= total_samples {
            return Err(Error::Seek {
                block: blocks.first + 1,
                reason: format!("input holds only {total_samples} samples"),
            });
        }

        let block_size = blocks.block_size as u64;
        let remaining = total_samples - start_sample;
        let available = remaining.div_ceil(block_size);
        let block_count = blocks.count.map_or(available, |n| n.min(available));

        Ok(Self {
            block_size: blocks.block_size,
            first_block: blocks.first,
            block_count,
            start_sample,
            sample_count: (block_count * block_size).min(remaining),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub plan: Plan,
    pub measurement: Measurement,
    pub level_source: LevelSource,
    pub desired_level_db: f64,
    /// Level the factor was computed from; `None` when only silence was found.
    pub measured_level_db: Option<f64>,
    pub factor: f64,
    /// Largest factor that would not have saturated.
    pub headroom: Option<f64>,
    pub samples_written: u64,
    pub saturated: u64,
}

/// Accumulates the planned blocks into `state`.
pub fn measure<R: Read + Seek>(
    reader: &mut PcmReader<R>,
    plan: &Plan,
    format: SampleFormat,
    state: &mut VoltmeterState,
    output: &Output,
) -> Result<()> {
    seek(reader, plan)?;

    let mut words = Vec::with_capacity(plan.block_size);
    let mut samples = Vec::with_capacity(plan.block_size);
    for _ in 0..plan.block_count {
        if reader
            .read_samples(plan.block_size, &mut words)
            .map_err(Error::Read)?
            == 0
        {
            break;
        }
        format.dequantize(&words, &mut samples);
        state.accumulate(&samples);
        output.inc();
    }

    debug!(
        samples = state.sample_count(),
        blocks = plan.block_count,
        "measurement pass done"
    );
    Ok(())
}

/// Rescales the planned blocks by `factor` into `writer`. Returns the number
/// of samples written and how many of them saturated.
pub fn equalize<R: Read + Seek, W: Write>(
    reader: &mut PcmReader<R>,
    writer: &mut PcmWriter<W>,
    plan: &Plan,
    format: SampleFormat,
    factor: f64,
    output: &Output,
) -> Result<(u64, u64)> {
    seek(reader, plan)?;

    let mut words = Vec::with_capacity(plan.block_size);
    let mut samples = Vec::with_capacity(plan.block_size);
    let (mut written, mut saturated) = (0u64, 0u64);
    for _ in 0..plan.block_count {
        let n = reader
            .read_samples(plan.block_size, &mut words)
            .map_err(Error::Read)?;
        if n == 0 {
            break;
        }
        format.dequantize(&words, &mut samples);
        apply_gain_in_place(&mut samples, factor);
        saturated += format.quantize(&samples, &mut words) as u64;
        writer.write_samples(&words).map_err(Error::Write)?;
        written += n as u64;
        output.inc();
    }
    writer.flush().map_err(Error::Write)?;

    debug!(written, saturated, "equalization pass done");
    Ok((written, saturated))
}

fn seek<R: Read + Seek>(reader: &mut PcmReader<R>, plan: &Plan) -> Result<()> {
    reader
        .seek_sample(plan.start_sample)
        .map_err(|e| Error::Seek {
            block: plan.first_block + 1,
            reason: e.to_string(),
        })
}

/// What the measurement pass decided.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Analysis {
    plan: Plan,
    measurement: Measurement,
    measured_level_db: Option<f64>,
    factor: f64,
    headroom: Option<f64>,
}

fn analyse<R: Read + Seek>(
    reader: &mut PcmReader<R>,
    total_samples: u64,
    settings: &Settings,
    output: &Output,
) -> Result<Analysis> {
    let plan = Plan::new(total_samples, &settings.blocks)?;

    let mut state = VoltmeterState::new(settings.sample_rate)?;
    output.set_length(2 * plan.block_count);
    output.set_stage("measuring");
    measure(reader, &plan, settings.format, &mut state, output)?;
    let measurement = state.estimate()?;

    let measured_level_db = select_level(&measurement, settings.level_source);
    let factor = match measured_level_db {
        Some(level) => compute_gain(level, settings.desired_level_db),
        None => {
            warn!("no active speech found; output is written without equalization");
            1.0
        }
    };
    let headroom = headroom_gain(measurement.stats().max_abs);
    info!(
        measured = ?measured_level_db,
        desired = settings.desired_level_db,
        factor,
        "equalization factor"
    );
    if let Some(headroom) = headroom.filter(|&h| factor > h) {
        warn!(
            factor,
            headroom, "factor exceeds the headroom of the input; peaks will clip"
        );
    }

    Ok(Analysis {
        plan,
        measurement,
        measured_level_db,
        factor,
        headroom,
    })
}

fn rescale<R: Read + Seek, W: Write>(
    reader: &mut PcmReader<R>,
    writer: &mut PcmWriter<W>,
    analysis: Analysis,
    settings: &Settings,
    output: &Output,
) -> Result<Outcome> {
    output.set_stage("scaling");
    let (samples_written, saturated) = equalize(
        reader,
        writer,
        &analysis.plan,
        settings.format,
        analysis.factor,
        output,
    )?;
    if saturated > 0 {
        warn!(saturated, "samples saturated during re-quantization");
    }

    Ok(Outcome {
        plan: analysis.plan,
        measurement: analysis.measurement,
        level_source: settings.level_source,
        desired_level_db: settings.desired_level_db,
        measured_level_db: analysis.measured_level_db,
        factor: analysis.factor,
        headroom: analysis.headroom,
        samples_written,
        saturated,
    })
}

/// Measures and equalizes one stream of `total_samples` samples.
pub fn process<R: Read + Seek, W: Write>(
    reader: &mut PcmReader<R>,
    writer: &mut PcmWriter<W>,
    total_samples: u64,
    settings: &Settings,
    output: &Output,
) -> Result<Outcome> {
    let analysis = analyse(reader, total_samples, settings, output)?;
    rescale(reader, writer, analysis, settings, output)
}

/// Runs both passes on the files named in `settings`. The output file is
/// only created once the measurement pass has succeeded.
pub fn run(settings: &Settings, output: &Output) -> Result<Outcome> {
    let open_err = |source| Error::OpenInput {
        path: settings.input.clone(),
        source,
    };
    let input = File::open(&settings.input).map_err(open_err)?;
    let total_bytes = input.metadata().map_err(open_err)?.len();
    let total_samples = total_bytes / settings.format.word_bytes() as u64;

    let mut reader = PcmReader::new(BufReader::new(input), settings.format);
    let analysis = analyse(&mut reader, total_samples, settings, output)?;

    let out = File::create(&settings.output).map_err(|source| Error::CreateOutput {
        path: settings.output.clone(),
        source,
    })?;
    let mut writer = PcmWriter::new(BufWriter::new(out), settings.format);
    rescale(&mut reader, &mut writer, analysis, settings, output)
}
