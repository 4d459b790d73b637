//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Synthesized replies arrive at 24 kHz mono f32 ([`super::TTS_SAMPLE_RATE`])
//! while output devices commonly run at 44.1 or 48 kHz. `RateConverter`
//! bridges that gap on the playback thread, where allocation is allowed.
//!
//! When source rate == device rate, `RateConverter` is a zero-copy
//! passthrough — no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{CondoVoiceError, Result};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == device rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input chunks between calls.
    input_buf: Vec<f32>,
    /// How many input samples rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Parameters
    /// - `source_rate`: Sample rate of the synthesized audio (Hz).
    /// - `device_rate`: Sample rate of the output device (Hz).
    /// - `chunk_size`: Input frame count per rubato call (e.g. `960`).
    ///
    /// # Errors
    /// Returns `CondoVoiceError::AudioOutput` if rubato fails to initialise.
    pub fn new(source_rate: u32, device_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == device_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = device_rate as f64 / source_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| CondoVoiceError::AudioOutput(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        tracing::info!(
            source_rate,
            device_rate,
            chunk_size,
            max_out,
            "resampling enabled from={} to={}",
            source_rate,
            device_rate
        );

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            chunk_size,
            output_buf,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full `chunk_size` block is
    /// available for rubato. Any remainder is kept for the next call.
    ///
    /// In passthrough mode (same rates), input is returned directly.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            // Zero-copy passthrough
            return samples.to_vec();
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();

        while self.input_buf.len() >= self.chunk_size {
            let input_slice = &self.input_buf[..self.chunk_size];

            match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            self.input_buf.drain(..self.chunk_size);
        }

        result
    }

    /// Flush the remainder of a reply by zero-padding the last partial chunk.
    ///
    /// Called once at the end of each reply so short tails are not held back
    /// waiting for input that will never arrive.
    pub fn flush(&mut self) -> Vec<f32> {
        if self.resampler.is_none() || self.input_buf.is_empty() {
            self.input_buf.clear();
            return Vec::new();
        }
        let pad = self.chunk_size - self.input_buf.len() % self.chunk_size;
        if pad != self.chunk_size {
            let zeros = vec![0f32; pad];
            return self.process(&zeros);
        }
        Vec::new()
    }

    /// Returns `true` when source rate == device rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let mut rc = RateConverter::new(24_000, 24_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let out = rc.process(&samples);
        assert_eq!(out, samples);
    }

    #[test]
    fn ratio_24k_to_48k_correct_length() {
        let mut rc = RateConverter::new(24_000, 48_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        // 960 input samples at 24 kHz → ~1920 at 48 kHz
        let samples = vec![0.0f32; 960];
        let out = rc.process(&samples);
        assert!(!out.is_empty(), "expected non-empty output");
        let expected = 1920usize;
        assert!(
            (out.len() as isize - expected as isize).unsigned_abs() <= 20,
            "output len={} expected≈{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn partial_accumulation_returns_empty() {
        let mut rc = RateConverter::new(24_000, 48_000, 960).unwrap();
        // Fewer than chunk_size samples → nothing output yet
        let samples = vec![0.0f32; 500];
        let out = rc.process(&samples);
        assert!(
            out.is_empty(),
            "expected empty output for partial chunk, got {}",
            out.len()
        );
    }

    #[test]
    fn flush_drains_the_partial_tail() {
        let mut rc = RateConverter::new(24_000, 48_000, 960).unwrap();
        assert!(rc.process(&vec![0.25f32; 500]).is_empty());
        let tail = rc.flush();
        assert!(!tail.is_empty(), "flush should emit the padded tail");
        // Nothing left after flush
        assert!(rc.flush().is_empty());
    }
}
