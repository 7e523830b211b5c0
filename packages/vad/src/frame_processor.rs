//! Frame-level hysteresis that turns detector scores into segments.

use std::collections::VecDeque;

use voice_relay_domain::Utterance;

use crate::config::SegmenterConfig;
use crate::detector::SpeechDetector;
use crate::error::Error;
use crate::segmenter::SegmentEvent;

struct ScoredFrame {
    samples: Vec<f32>,
    is_speech: bool,
}

pub(crate) struct FrameProcessor {
    config: SegmenterConfig,
    detector: Box<dyn SpeechDetector>,
    /// Samples not yet forming a whole frame.
    pending: Vec<f32>,
    /// Frames of the current segment, or the pre-speech pad while idle.
    frames: VecDeque<ScoredFrame>,
    speaking: bool,
    redemption_counter: usize,
}

impl FrameProcessor {
    pub(crate) fn new(config: SegmenterConfig, detector: Box<dyn SpeechDetector>) -> Self {
        Self {
            pending: Vec::with_capacity(config.frame_samples * 2),
            frames: VecDeque::new(),
            config,
            detector,
            speaking: false,
            redemption_counter: 0,
        }
    }

    pub(crate) fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Feed an arbitrary-length chunk, returning events in order.
    pub(crate) fn process(&mut self, samples: &[f32]) -> Result<Vec<SegmentEvent>, Error> {
        self.pending.extend_from_slice(samples);
        let frame_samples = self.config.frame_samples;
        let mut events = Vec::new();
        while self.pending.len() >= frame_samples {
            let frame: Vec<f32> = self.pending.drain(..frame_samples).collect();
            if let Some(event) = self.process_frame(frame)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn process_frame(&mut self, frame: Vec<f32>) -> Result<Option<SegmentEvent>, Error> {
        let probability = self.detector.speech_probability(&frame)?;
        let is_speech = probability >= self.config.positive_speech_threshold;
        self.frames.push_back(ScoredFrame {
            samples: frame,
            is_speech,
        });

        if is_speech {
            self.redemption_counter = 0;
            if !self.speaking {
                self.speaking = true;
                tracing::debug!(probability, "speech started");
                return Ok(Some(SegmentEvent::SpeechStart));
            }
        }

        if self.speaking && probability < self.config.negative_speech_threshold {
            self.redemption_counter += 1;
            if self.redemption_counter >= self.config.redemption_frames {
                return Ok(Some(self.end_segment()));
            }
        }

        if !self.speaking {
            while self.frames.len() > self.config.pre_speech_pad_frames {
                self.frames.pop_front();
            }
        }
        Ok(None)
    }

    fn end_segment(&mut self) -> SegmentEvent {
        self.speaking = false;
        self.redemption_counter = 0;
        let frames = std::mem::take(&mut self.frames);
        let speech_frames = frames.iter().filter(|f| f.is_speech).count();
        if speech_frames < self.config.min_speech_frames {
            tracing::debug!(speech_frames, "segment too short, misfire");
            return SegmentEvent::Misfire;
        }
        let samples: Vec<f32> = frames.into_iter().flat_map(|f| f.samples).collect();
        let utterance = Utterance::from(samples);
        tracing::debug!(
            speech_frames,
            duration_ms = utterance.duration_ms(),
            "speech ended"
        );
        SegmentEvent::SpeechEnd(utterance)
    }

    /// Discard any partial segment and detector state.
    pub(crate) fn reset(&mut self) {
        self.pending.clear();
        self.frames.clear();
        self.speaking = false;
        self.redemption_counter = 0;
        self.detector.reset();
    }
}
