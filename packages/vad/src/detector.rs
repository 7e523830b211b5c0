//! Speech detector capability and the loaders that provide it.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::energy::EnergyDetector;
use crate::error::Error;

/// Scores fixed-size frames of 16 kHz mono audio.
pub trait SpeechDetector: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Probability in `[0, 1]` that `frame` contains speech.
    fn speech_probability(&mut self, frame: &[f32]) -> Result<f32, Error>;

    /// Drop any recurrent state carried between frames.
    fn reset(&mut self);
}

/// Produces a ready detector for frames of `frame_samples` samples.
///
/// Loading is where runtime assets are read, so failures here surface as
/// [`Error::DependencyUnavailable`].
pub trait DetectorLoader: Send + Sync {
    fn load(&self, frame_samples: usize) -> Result<Box<dyn SpeechDetector>, Error>;
}

impl<F> DetectorLoader for F
where
    F: Fn(usize) -> Result<Box<dyn SpeechDetector>, Error> + Send + Sync,
{
    fn load(&self, frame_samples: usize) -> Result<Box<dyn SpeechDetector>, Error> {
        self(frame_samples)
    }
}

const fn default_energy_threshold() -> f32 {
    0.015
}

/// Detector selection as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectorBackend {
    /// RMS threshold; needs no assets.
    Energy {
        #[serde(default = "default_energy_threshold")]
        threshold: f32,
    },
    /// Silero ONNX model loaded from `model_path`.
    Silero { model_path: PathBuf },
}

impl Default for DetectorBackend {
    fn default() -> Self {
        DetectorBackend::Energy {
            threshold: default_energy_threshold(),
        }
    }
}

impl DetectorLoader for DetectorBackend {
    fn load(&self, frame_samples: usize) -> Result<Box<dyn SpeechDetector>, Error> {
        match self {
            DetectorBackend::Energy { threshold } => Ok(Box::new(EnergyDetector::new(*threshold))),
            DetectorBackend::Silero { model_path } => load_silero(model_path, frame_samples),
        }
    }
}

#[cfg(feature = "silero")]
fn load_silero(
    model_path: &std::path::Path,
    frame_samples: usize,
) -> Result<Box<dyn SpeechDetector>, Error> {
    let detector = crate::silero::SileroDetector::builder()
        .model_path(model_path)
        .chunk_size(frame_samples)
        .sample_rate(i64::from(voice_relay_domain::SAMPLE_RATE))
        .build()?;
    Ok(Box::new(detector))
}

#[cfg(not(feature = "silero"))]
fn load_silero(
    model_path: &std::path::Path,
    _frame_samples: usize,
) -> Result<Box<dyn SpeechDetector>, Error> {
    Err(Error::DependencyUnavailable(format!(
        "cannot load {}: built without the `silero` feature",
        model_path.display()
    )))
}
