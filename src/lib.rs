//! Active speech level measurement (ITU-T P.56) and level equalization of
//! raw PCM speech files.

pub mod config;
pub mod equalizer;
pub mod error;
pub mod gain;
pub mod json;
pub mod output;
pub mod pcm;
pub mod report;
pub mod voltmeter;

pub use error::{Error, Result, VoltmeterError};
pub use voltmeter::{Measurement, VoltmeterState};
