//! Headerless little-endian PCM, left-justified in 16- or 24-bit words.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use tracing::warn;

use crate::error::{Error, Result};

pub const DEFAULT_RESOLUTION: u32 = 16;
pub const MIN_RESOLUTION: u32 = 2;
pub const MAX_RESOLUTION: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    resolution: u32,
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl SampleFormat {
    pub fn new(resolution: u32) -> Result<Self> {
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
            return Err(Error::InvalidParameter(format!(
                "resolution must be between {MIN_RESOLUTION} and {MAX_RESOLUTION} bits, got {resolution}"
            )));
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Bytes per sample word in the file.
    pub fn word_bytes(&self) -> usize {
        if self.resolution <= 16 { 2 } else { 3 }
    }

    /// Unused low bits of each word.
    fn shift(&self) -> u32 {
        self.word_bytes() as u32 * 8 - self.resolution
    }

    /// `2^(resolution-1)`, the value that maps to 1.0.
    pub fn full_scale(&self) -> f64 {
        f64::from(1u32 << (self.resolution - 1))
    }

    pub fn min_value(&self) -> i32 {
        -(1 << (self.resolution - 1))
    }

    pub fn max_value(&self) -> i32 {
        (1 << (self.resolution - 1)) - 1
    }

    /// Integer samples to floats in `[-1, 1)`. Replaces the contents of `out`.
    pub fn dequantize(&self, values: &[i32], out: &mut Vec<f32>) {
        let scale = self.full_scale();
        out.clear();
        out.extend(values.iter().map(|&v| (f64::from(v) / scale) as f32));
    }

    /// Floats to integers: scale, truncate toward zero, hard clip.
    /// Replaces the contents of `out` and returns how many samples clipped.
    pub fn quantize(&self, samples: &[f32], out: &mut Vec<i32>) -> usize {
        let scale = self.full_scale();
        let (min, max) = (self.min_value(), self.max_value());
        let mut saturated = 0;

        out.clear();
        out.extend(samples.iter().map(|&s| {
            let scaled = (f64::from(s) * scale).trunc();
            if scaled > f64::from(max) {
                saturated += 1;
                max
            } else if scaled < f64::from(min) {
                saturated += 1;
                min
            } else {
                scaled as i32
            }
        }));
        saturated
    }

    /// Decodes whole words from `bytes`, appending to `out`.
    pub fn decode(&self, bytes: &[u8], out: &mut Vec<i32>) {
        let shift = self.shift();
        match self.word_bytes() {
            2 => out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|w| i32::from(i16::from_le_bytes([w[0], w[1]])) >> shift),
            ),
            _ => out.extend(bytes.chunks_exact(3).map(|w| {
                let word =
                    i32::from(w[0]) | (i32::from(w[1]) << 8) | (i32::from(w[2] as i8) << 16);
                word >> shift
            })),
        }
    }

    /// Encodes `values` as words, appending to `out`.
    pub fn encode(&self, values: &[i32], out: &mut Vec<u8>) {
        let shift = self.shift();
        for &v in values {
            let word = v << shift;
            match self.word_bytes() {
                2 => out.extend_from_slice(&(word as i16).to_le_bytes()),
                _ => out.extend_from_slice(&word.to_le_bytes()[..3]),
            }
        }
    }
}

pub struct PcmReader<R> {
    inner: R,
    format: SampleFormat,
    buf: Vec<u8>,
}

impl<R: Read + Seek> PcmReader<R> {
    pub fn new(inner: R, format: SampleFormat) -> Self {
        Self {
            inner,
            format,
            buf: Vec::new(),
        }
    }

    pub fn seek_sample(&mut self, sample: u64) -> io::Result<()> {
        let offset = sample * self.format.word_bytes() as u64;
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Reads up to `len` samples into `out`, returning how many were read;
    /// fewer than `len` only at end of input.
    pub fn read_samples(&mut self, len: usize, out: &mut Vec<i32>) -> io::Result<usize> {
        let word_bytes = self.format.word_bytes();
        let want = len * word_bytes;
        self.buf.resize(want, 0);

        let mut filled = 0;
        while filled < want {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let whole = filled / word_bytes;
        if filled % word_bytes != 0 {
            warn!(
                bytes = filled % word_bytes,
                "ignoring incomplete sample word at end of input"
            );
        }

        out.clear();
        self.format.decode(&self.buf[..whole * word_bytes], out);
        Ok(whole)
    }
}

pub struct PcmWriter<W> {
    inner: W,
    format: SampleFormat,
    buf: Vec<u8>,
}

impl<W: Write> PcmWriter<W> {
    pub fn new(inner: W, format: SampleFormat) -> Self {
        Self {
            inner,
            format,
            buf: Vec::new(),
        }
    }

    pub fn write_samples(&mut self, values: &[i32]) -> io::Result<()> {
        self.buf.clear();
        self.format.encode(values, &mut self.buf);
        self.inner.write_all(&self.buf)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
