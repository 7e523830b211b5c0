//! Segmentation thresholds.
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hysteresis and framing parameters for the segmenter.
///
/// Defaults match the browser VAD the relay was first deployed with: 1536
/// sample frames (96 ms at 16 kHz), speech above 0.5, silence below 0.35,
/// eight frames of grace before a segment closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Samples per detector frame.
    pub frame_samples: usize,
    /// Frames scoring at or above this count as speech.
    pub positive_speech_threshold: f32,
    /// Frames scoring below this count toward ending a segment.
    pub negative_speech_threshold: f32,
    /// Consecutive quiet frames tolerated before a segment ends.
    pub redemption_frames: usize,
    /// Frames of audio kept from before speech starts.
    pub pre_speech_pad_frames: usize,
    /// Segments with fewer speech frames are reported as misfires.
    pub min_speech_frames: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            frame_samples: 1536,
            positive_speech_threshold: 0.5,
            negative_speech_threshold: 0.35,
            redemption_frames: 8,
            pre_speech_pad_frames: 1,
            min_speech_frames: 3,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.frame_samples == 0 {
            return Err(Error::InvalidConfig("frame_samples must be positive".into()));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.positive_speech_threshold) || !in_unit(self.negative_speech_threshold) {
            return Err(Error::InvalidConfig(
                "speech thresholds must lie in [0, 1]".into(),
            ));
        }
        if self.negative_speech_threshold > self.positive_speech_threshold {
            return Err(Error::InvalidConfig(format!(
                "negative threshold {} exceeds positive threshold {}",
                self.negative_speech_threshold, self.positive_speech_threshold
            )));
        }
        if self.redemption_frames == 0 || self.min_speech_frames == 0 {
            return Err(Error::InvalidConfig(
                "redemption_frames and min_speech_frames must be positive".into(),
            ));
        }
        Ok(())
    }
}
