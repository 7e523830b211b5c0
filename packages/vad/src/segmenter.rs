//! Segmenter lifecycle: lazy detector loading, start and pause.

use voice_relay_domain::Utterance;

use crate::config::SegmenterConfig;
use crate::detector::DetectorLoader;
use crate::error::Error;
use crate::frame_processor::FrameProcessor;

/// What the segmenter observed in the audio it was fed.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Speech began; no audio yet.
    SpeechStart,
    /// Speech ended; carries the whole segment including padding.
    SpeechEnd(Utterance),
    /// Speech began but was too short to be real; nothing to send.
    Misfire,
}

/// Partitions a continuous 16 kHz stream into utterances.
///
/// The detector is loaded on the first successful [`init`](Self::init) and
/// kept for the lifetime of the segmenter; [`pause`](Self::pause) and
/// [`start`](Self::start) only gate emission.
pub struct VoiceSegmenter {
    config: SegmenterConfig,
    loader: Box<dyn DetectorLoader>,
    processor: Option<FrameProcessor>,
    running: bool,
}

impl VoiceSegmenter {
    pub fn new(
        config: SegmenterConfig,
        loader: impl DetectorLoader + 'static,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            loader: Box::new(loader),
            processor: None,
            running: false,
        })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Load the detector. Calling this again after success does nothing.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.processor.is_some() {
            tracing::debug!("segmenter already initialized");
            return Ok(());
        }
        let detector = self.loader.load(self.config.frame_samples)?;
        let processor = FrameProcessor::new(self.config, detector);
        tracing::info!(
            detector = processor.detector_name(),
            frame_samples = self.config.frame_samples,
            "segmenter initialized"
        );
        self.processor = Some(processor);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.processor.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin emitting segments. Requires a prior successful [`init`](Self::init).
    pub fn start(&mut self) -> Result<(), Error> {
        if self.processor.is_none() {
            return Err(Error::NotInitialized);
        }
        self.running = true;
        Ok(())
    }

    /// Stop emitting segments, dropping any partially collected speech.
    pub fn pause(&mut self) {
        if let Some(processor) = self.processor.as_mut() {
            processor.reset();
        }
        self.running = false;
    }

    /// Feed captured samples. Returns no events while paused.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<SegmentEvent>, Error> {
        if !self.running {
            return Ok(Vec::new());
        }
        match self.processor.as_mut() {
            Some(processor) => processor.process(samples),
            None => Err(Error::NotInitialized),
        }
    }
}
