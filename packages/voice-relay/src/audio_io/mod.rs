//! Audio sources that feed the segmenter with 16 kHz mono chunks.

#[cfg(feature = "microphone")]
pub mod microphone;
pub mod resample;
pub mod wav_file;

use tokio::sync::mpsc;
use voice_relay_domain::RelayError;

#[cfg(feature = "microphone")]
pub use microphone::{MicrophoneSource, list_input_devices};
pub use wav_file::WavFileSource;

/// Releases an acquired source when dropped.
pub struct CaptureRelease(Option<Box<dyn FnOnce() + Send>>);

impl CaptureRelease {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }
}

impl Drop for CaptureRelease {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

/// An acquired source: a chunk stream plus the guard that keeps it open.
///
/// The stream ends when the source runs out or is released.
pub struct AudioCapture {
    chunks: mpsc::UnboundedReceiver<Vec<f32>>,
    release: CaptureRelease,
}

impl AudioCapture {
    pub fn new(
        chunks: mpsc::UnboundedReceiver<Vec<f32>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            chunks,
            release: CaptureRelease::new(release),
        }
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<Vec<f32>>, CaptureRelease) {
        (self.chunks, self.release)
    }
}

/// Something that can be opened for capture, possibly many times.
pub trait AudioSource: Send {
    /// Human-readable description for status lines.
    fn describe(&self) -> String;

    /// Acquire the source. Failure is reported as `PermissionDenied`.
    fn open(&mut self) -> Result<AudioCapture, RelayError>;
}
