//! Replays a WAV file as if it were being captured.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use voice_relay_domain::{RelayError, SAMPLE_RATE};

use super::resample::{MonoResampler, downmix};
use super::{AudioCapture, AudioSource};

/// Chunk length handed to the pipeline, in milliseconds.
const CHUNK_MS: u64 = 100;

/// Read a WAV file into mono samples at the pipeline rate.
pub fn decode_wav(path: &Path) -> Result<Vec<f32>, RelayError> {
    let denied = |e: hound::Error| {
        RelayError::PermissionDenied(format!("cannot read {}: {e}", path.display()))
    };
    let mut reader = hound::WavReader::open(path).map_err(denied)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(denied)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(denied)?
        }
    };

    let mono = downmix(&interleaved, usize::from(spec.channels));
    let mut resampler = MonoResampler::new(spec.sample_rate)?;
    let mut samples = resampler.process(&mono)?;
    samples.extend(resampler.flush()?);
    tracing::debug!(
        path = %path.display(),
        input_rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        "decoded wav file"
    );
    Ok(samples)
}

/// Each `open` replays the file from the start.
#[derive(Debug, Clone)]
pub struct WavFileSource {
    path: PathBuf,
    realtime: bool,
}

impl WavFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: true,
        }
    }

    /// Deliver chunks at capture speed (default) or as fast as possible.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

impl AudioSource for WavFileSource {
    fn describe(&self) -> String {
        format!("wav file {}", self.path.display())
    }

    fn open(&mut self) -> Result<AudioCapture, RelayError> {
        let samples = decode_wav(&self.path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));
        let stop = released.clone();
        let realtime = self.realtime;
        let chunk_len = (SAMPLE_RATE as u64 * CHUNK_MS / 1000) as usize;

        thread::Builder::new()
            .name("voice-relay-wav".to_string())
            .spawn(move || {
                for chunk in samples.chunks(chunk_len) {
                    if stop.load(Ordering::SeqCst) || tx.send(chunk.to_vec()).is_err() {
                        return;
                    }
                    if realtime {
                        thread::sleep(Duration::from_millis(CHUNK_MS));
                    }
                }
                tracing::debug!("wav replay finished");
            })
            .map_err(|e| {
                RelayError::PermissionDenied(format!("failed to spawn replay thread: {e}"))
            })?;

        Ok(AudioCapture::new(rx, move || {
            released.store(true, Ordering::SeqCst);
        }))
    }
}
