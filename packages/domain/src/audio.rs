//! Audio buffers flowing from the segmenter to the wire.

/// Sample rate of every buffer in the pipeline, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// One detected speech segment as mono f32 samples at [`SAMPLE_RATE`].
///
/// Produced once by the segmenter and consumed once by the encoder; the
/// samples cannot be modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    samples: Box<[f32]>,
}

impl Utterance {
    /// Wrap a finished sample buffer.
    pub fn new(samples: impl Into<Box<[f32]>>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds at [`SAMPLE_RATE`].
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / SAMPLE_RATE as u64
    }
}

impl From<Vec<f32>> for Utterance {
    fn from(samples: Vec<f32>) -> Self {
        Self::new(samples)
    }
}

/// Signed 16-bit PCM, one value per utterance sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PcmBuffer(Vec<i16>);

impl PcmBuffer {
    pub fn new(samples: Vec<i16>) -> Self {
        Self(samples)
    }

    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the little-endian byte representation.
    pub fn byte_len(&self) -> usize {
        self.0.len() * 2
    }

    /// Append the little-endian bytes of every sample to `out`.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.byte_len());
        for sample in &self.0 {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
}
