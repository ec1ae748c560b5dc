use std::path::PathBuf;

use clap::Parser;
use sv56::{
    config::{RawSettings, Verbosity},
    gain::LevelSource,
};

/// Measures the active speech level of a raw PCM file (ITU-T P.56) and
/// writes a copy equalized to the desired level.
///
/// Positional parameters after FILE_OUT override the equivalent options.
#[derive(Parser, Debug)]
#[command(name = "sv56", version)]
pub struct Cli {
    /// File to be analysed and equalized
    #[arg(value_name = "FILE_IN")]
    pub input: PathBuf,

    /// Equalized output file
    #[arg(value_name = "FILE_OUT")]
    pub output: PathBuf,

    /// Block size, in samples
    #[arg(value_name = "BLOCK_SIZE")]
    pub block_size: Option<usize>,

    /// First block to process, counted from 1
    #[arg(value_name = "FIRST_BLOCK")]
    pub first_block: Option<u64>,

    /// Number of blocks to process
    #[arg(value_name = "NUM_BLOCKS")]
    pub num_blocks: Option<u64>,

    /// Desired output level, in dBov
    #[arg(value_name = "DESIRED_LEVEL_DB", allow_negative_numbers = true)]
    pub desired_level: Option<f64>,

    /// Sampling rate, in Hz
    #[arg(value_name = "SAMPLE_RATE")]
    pub sample_rate: Option<f64>,

    /// Resolution of the A/D and D/A systems, in bits
    #[arg(value_name = "RESOLUTION")]
    pub resolution: Option<u32>,

    /// Word length in bits [default: 16]
    #[arg(long = "bits", value_name = "N")]
    pub bits: Option<u32>,

    /// Desired output level in dBov [default: -26]
    #[arg(long = "lev", value_name = "DB", allow_negative_numbers = true)]
    pub level: Option<f64>,

    /// Append the statistics summary to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// No progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// One-line summary, no progress bar
    #[arg(long = "qq")]
    pub short_summary: bool,

    /// Equalize by the long-term RMS level instead of the active speech level
    #[arg(long)]
    pub rms: bool,

    /// Sampling rate in Hz [default: 16000]
    #[arg(long = "sf", value_name = "HZ")]
    pub sf: Option<f64>,

    /// Block size in samples [default: 256]
    #[arg(long = "blk", value_name = "LEN")]
    pub blk: Option<usize>,

    /// First block to process, counted from 1 [default: 1]
    #[arg(long, value_name = "SB")]
    pub start: Option<u64>,

    /// Last block to process, inclusive
    #[arg(long, value_name = "EB", conflicts_with = "blocks")]
    pub end: Option<u64>,

    /// Number of blocks to process [default: whole file]
    #[arg(short = 'n', long = "blocks", value_name = "NB")]
    pub blocks: Option<u64>,

    /// Write the statistics as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

impl Cli {
    pub fn into_raw(self) -> RawSettings {
        let mut raw = RawSettings::new(self.input, self.output);

        if let Some(n) = self.block_size.or(self.blk) {
            raw.block_size = n;
        }
        if let Some(sb) = self.first_block.or(self.start) {
            raw.start_block = sb;
        }
        raw.block_count = self.num_blocks.or(self.blocks);
        raw.end_block = if self.num_blocks.is_some() {
            None
        } else {
            self.end
        };
        if let Some(db) = self.desired_level.or(self.level) {
            raw.desired_level_db = db;
        }
        if let Some(fs) = self.sample_rate.or(self.sf) {
            raw.sample_rate = fs;
        }
        if let Some(bits) = self.resolution.or(self.bits) {
            raw.resolution = bits;
        }

        raw.level_source = if self.rms {
            LevelSource::LongTerm
        } else {
            LevelSource::Active
        };
        raw.verbosity = if self.short_summary {
            Verbosity::Short
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };
        raw.log = self.log;
        raw.json = self.json;
        raw
    }
}
