use std::path::PathBuf;

use crate::{
    error::{Error, Result},
    gain::LevelSource,
    pcm::{DEFAULT_RESOLUTION, SampleFormat},
};

pub const DEFAULT_BLOCK_SIZE: usize = 256;
pub const DEFAULT_DESIRED_LEVEL_DB: f64 = -26.0;
pub const DEFAULT_SAMPLE_RATE: f64 = 16000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Progress bar and long summary.
    #[default]
    Normal,
    /// Long summary only.
    Quiet,
    /// One-line summary only.
    Short,
}

impl Verbosity {
    pub fn shows_progress(&self) -> bool {
        *self == Verbosity::Normal
    }
}

/// Which blocks of the input to process. `first` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub block_size: usize,
    pub first: u64,
    /// `None` processes up to the end of the input.
    pub count: Option<u64>,
}

impl Default for BlockRange {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            first: 0,
            count: None,
        }
    }
}

impl BlockRange {
    /// Sample offset of the first block, `None` if it does not fit in `u64`.
    pub fn checked_start_sample(&self) -> Option<u64> {
        self.first.checked_mul(self.block_size as u64)
    }

    /// Sample offset of the first block, saturating at `u64::MAX`.
    pub fn start_sample(&self) -> u64 {
        self.checked_start_sample().unwrap_or(u64::MAX)
    }
}

/// Unvalidated values as collected from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSettings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub block_size: usize,
    /// 1-based.
    pub start_block: u64,
    pub block_count: Option<u64>,
    /// 1-based, inclusive.
    pub end_block: Option<u64>,
    pub desired_level_db: f64,
    pub sample_rate: f64,
    pub resolution: u32,
    pub level_source: LevelSource,
    pub verbosity: Verbosity,
    pub log: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl RawSettings {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            start_block: 1,
            block_count: None,
            end_block: None,
            desired_level_db: DEFAULT_DESIRED_LEVEL_DB,
            sample_rate: DEFAULT_SAMPLE_RATE,
            resolution: DEFAULT_RESOLUTION,
            level_source: LevelSource::default(),
            verbosity: Verbosity::default(),
            log: None,
            json: None,
        }
    }
}

/// Checked parameters for one equalization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub blocks: BlockRange,
    pub desired_level_db: f64,
    pub sample_rate: f64,
    pub format: SampleFormat,
    pub level_source: LevelSource,
    pub verbosity: Verbosity,
    pub log: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidParameter(msg.into())
}

impl Settings {
    pub fn validate(raw: RawSettings) -> Result<Self> {
        if raw.block_size == 0 {
            return Err(invalid("block size must be at least 1 sample"));
        }
        if raw.start_block == 0 {
            return Err(invalid("first block is numbered from 1"));
        }
        if !raw.sample_rate.is_finite() || raw.sample_rate <= 0.0 {
            return Err(invalid(format!(
                "sample rate must be positive, got {}",
                raw.sample_rate
            )));
        }
        if !raw.desired_level_db.is_finite() {
            return Err(invalid("desired level must be a finite number of dB"));
        }
        let format = SampleFormat::new(raw.resolution)?;

        let count = match (raw.block_count, raw.end_block) {
            (Some(_), Some(_)) => {
                return Err(invalid("number of blocks and end block are exclusive"));
            }
            (Some(0), None) => return Err(invalid("number of blocks must be at least 1")),
            (Some(n), None) => Some(n),
            (None, Some(end)) if end < raw.start_block => {
                return Err(invalid(format!(
                    "end block {end} is before start block {}",
                    raw.start_block
                )));
            }
            (None, Some(end)) => Some(end - raw.start_block + 1),
            (None, None) => None,
        };

        let blocks = BlockRange {
            block_size: raw.block_size,
            first: raw.start_block - 1,
            count,
        };
        if blocks.checked_start_sample().is_none() {
            return Err(invalid(format!(
                "first block {} of {} samples is beyond any addressable input",
                raw.start_block, raw.block_size
            )));
        }

        Ok(Self {
            input: raw.input,
            output: raw.output,
            blocks,
            desired_level_db: raw.desired_level_db,
            sample_rate: raw.sample_rate,
            format,
            level_source: raw.level_source,
            verbosity: raw.verbosity,
            log: raw.log,
            json: raw.json,
        })
    }
}
