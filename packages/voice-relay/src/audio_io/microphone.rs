//! Live microphone capture through cpal.
//!
//! A cpal stream is not `Send` on every platform, so each capture owns a
//! dedicated thread that builds the stream, keeps it alive, and drops it when
//! released.

use std::sync::mpsc as std_mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tokio::sync::mpsc;
use voice_relay_domain::RelayError;

use super::resample::{MonoResampler, downmix};
use super::{AudioCapture, AudioSource};

/// Default input device, or one picked by name.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneSource {
    device: Option<String>,
}

impl MicrophoneSource {
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }
}

/// Names of every input-capable device on the default host.
pub fn list_input_devices() -> Result<Vec<String>, RelayError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| RelayError::Configuration(format!("failed to enumerate input devices: {e}")))?;
    Ok(devices
        .filter_map(|device| device.name().ok())
        .collect())
}

fn find_device(name: Option<&str>) -> Result<Device, RelayError> {
    let host = cpal::default_host();
    match name {
        None => host.default_input_device().ok_or_else(|| {
            RelayError::PermissionDenied("no default input device available".to_string())
        }),
        Some(name) => host
            .input_devices()
            .map_err(|e| {
                RelayError::PermissionDenied(format!("failed to enumerate input devices: {e}"))
            })?
            .find(|device| device.name().is_ok_and(|n| n == name))
            .ok_or_else(|| RelayError::PermissionDenied(format!("input device {name} not found"))),
    }
}

fn build_stream(
    name: Option<&str>,
    chunks: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<(Stream, String), RelayError> {
    let device = find_device(name)?;
    let device_name = device.name().unwrap_or_else(|_| "(unnamed)".to_string());
    let supported = device.default_input_config().map_err(|e| {
        RelayError::PermissionDenied(format!("no usable input config for {device_name}: {e}"))
    })?;
    tracing::debug!(device = %device_name, config = ?supported, "using audio device");

    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let stream = match format {
        SampleFormat::F32 => input_stream::<f32>(&device, &config, chunks),
        SampleFormat::I16 => input_stream::<i16>(&device, &config, chunks),
        SampleFormat::U16 => input_stream::<u16>(&device, &config, chunks),
        SampleFormat::I32 => input_stream::<i32>(&device, &config, chunks),
        other => Err(RelayError::PermissionDenied(format!(
            "unsupported sample format {other}"
        ))),
    }?;
    stream
        .play()
        .map_err(|e| RelayError::PermissionDenied(format!("failed to start audio stream: {e}")))?;
    Ok((stream, device_name))
}

fn input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    chunks: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<Stream, RelayError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels);
    let mut resampler = MonoResampler::new(config.sample_rate.0)?;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
                match resampler.process(&downmix(&samples, channels)) {
                    Ok(chunk) if !chunk.is_empty() => {
                        let _ = chunks.send(chunk);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "dropping captured audio"),
                }
            },
            |err| tracing::error!(error = %err, "audio stream error"),
            None,
        )
        .map_err(|e| RelayError::PermissionDenied(format!("failed to build input stream: {e}")))
}

impl AudioSource for MicrophoneSource {
    fn describe(&self) -> String {
        match &self.device {
            Some(name) => format!("microphone '{name}'"),
            None => "default microphone".to_string(),
        }
    }

    fn open(&mut self) -> Result<AudioCapture, RelayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<String, RelayError>>(1);
        let device = self.device.clone();

        thread::Builder::new()
            .name("voice-relay-capture".to_string())
            .spawn(move || match build_stream(device.as_deref(), tx) {
                Ok((stream, name)) => {
                    let _ = ready_tx.send(Ok(name));
                    // Blocks until released or the capture handle is dropped.
                    let _ = release_rx.recv();
                    drop(stream);
                    tracing::debug!("microphone released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| {
                RelayError::PermissionDenied(format!("failed to spawn capture thread: {e}"))
            })?;

        let name = ready_rx.recv().map_err(|_| {
            RelayError::PermissionDenied("capture thread exited before opening".to_string())
        })??;
        tracing::info!(device = %name, "microphone opened");
        Ok(AudioCapture::new(rx, move || {
            let _ = release_tx.send(());
        }))
    }
}
