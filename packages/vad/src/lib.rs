//! Voice segmentation for the relay pipeline.
//!
//! A [`VoiceSegmenter`] turns a continuous 16 kHz mono stream into discrete
//! [`Utterance`](voice_relay_domain::Utterance)s. The speech/silence decision
//! itself is delegated to a [`SpeechDetector`] obtained from a
//! [`DetectorLoader`]; the segmenter only reframes audio, applies hysteresis,
//! and reports [`SegmentEvent`]s.

pub mod config;
pub mod detector;
pub mod energy;
pub mod error;
mod frame_processor;
pub mod segmenter;
#[cfg(feature = "silero")]
pub mod silero;

pub use config::SegmenterConfig;
pub use detector::{DetectorBackend, DetectorLoader, SpeechDetector};
pub use energy::EnergyDetector;
pub use error::Error;
pub use segmenter::{SegmentEvent, VoiceSegmenter};
#[cfg(feature = "silero")]
pub use silero::{SileroDetector, SileroDetectorBuilder};
