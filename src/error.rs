use std::{io, path::PathBuf};

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the speech voltmeter itself. These indicate bad parameters or
/// an inconsistency between activity counts and thresholds, never I/O.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoltmeterError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    #[error(
        "threshold bracket has no sign change: upper excess {upper_excess:.3} dB, lower excess {lower_excess:.3} dB"
    )]
    InvalidBracket { upper_excess: f64, lower_excess: f64 },

    #[error("interpolation did not converge after {iterations} iterations (tolerance {tolerance:.3} dB)")]
    NoConvergence { tolerance: f64, iterations: u32 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cannot open input file {}: {source}", .path.display())]
    OpenInput { path: PathBuf, source: io::Error },

    #[error("cannot create output file {}: {source}", .path.display())]
    CreateOutput { path: PathBuf, source: io::Error },

    #[error("cannot seek to block {block}: {reason}")]
    Seek { block: u64, reason: String },

    #[error("error reading input: {0}")]
    Read(#[source] io::Error),

    #[error("error writing output: {0}")]
    Write(#[source] io::Error),

    #[error(transparent)]
    Voltmeter(#[from] VoltmeterError),
}

impl Error {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidParameter(_) | Error::Voltmeter(_) => 1,
            Error::OpenInput { .. } => 2,
            Error::CreateOutput { .. } => 3,
            Error::Seek { .. } => 4,
            Error::Read(_) => 5,
            Error::Write(_) => 6,
        }
    }
}
