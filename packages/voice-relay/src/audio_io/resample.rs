//! Mono mix-down and conversion to the pipeline rate.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use voice_relay_domain::{RelayError, SAMPLE_RATE};

const CHUNK_SIZE: usize = 1024;

/// Average interleaved channels into one.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Streaming converter from an arbitrary input rate to [`SAMPLE_RATE`].
pub struct MonoResampler {
    resampler: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
}

impl MonoResampler {
    pub fn new(input_rate: u32) -> Result<Self, RelayError> {
        let resampler = if input_rate == SAMPLE_RATE {
            None
        } else {
            let ratio = f64::from(SAMPLE_RATE) / f64::from(input_rate);
            let resampler =
                FastFixedIn::<f32>::new(ratio, 10.0, PolynomialDegree::Septic, CHUNK_SIZE, 1)
                    .map_err(|e| {
                        RelayError::AudioProcessing(format!("failed to create resampler: {e}"))
                    })?;
            tracing::debug!(input_rate, output_rate = SAMPLE_RATE, "resampling input");
            Some(resampler)
        };
        Ok(Self {
            resampler,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Convert as many whole chunks as are available; the rest waits.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, RelayError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(samples.to_vec());
        };
        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        let mut consumed = 0;
        while self.pending.len() - consumed >= CHUNK_SIZE {
            let chunk = &self.pending[consumed..consumed + CHUNK_SIZE];
            let resampled = resampler
                .process(&[chunk], None)
                .map_err(|e| RelayError::AudioProcessing(format!("resampling failed: {e}")))?;
            if let Some(channel) = resampled.first() {
                out.extend_from_slice(channel);
            }
            consumed += CHUNK_SIZE;
        }
        self.pending.drain(..consumed);
        Ok(out)
    }

    /// Convert whatever is left at end of input.
    pub fn flush(&mut self) -> Result<Vec<f32>, RelayError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let tail = std::mem::take(&mut self.pending);
        let input: [&[f32]; 1] = [tail.as_slice()];
        let resampled = resampler
            .process_partial(Some(&input[..]), None)
            .map_err(|e| RelayError::AudioProcessing(format!("resampling failed: {e}")))?;
        Ok(resampled.into_iter().next().unwrap_or_default())
    }
}
