//! Energy-based detection: a frame is speech when its RMS exceeds a threshold.

use crate::detector::SpeechDetector;
use crate::error::Error;

pub struct EnergyDetector {
    threshold: f32,
}

impl EnergyDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }
}

impl SpeechDetector for EnergyDetector {
    fn name(&self) -> &str {
        "energy"
    }

    fn speech_probability(&mut self, frame: &[f32]) -> Result<f32, Error> {
        Ok(if Self::rms(frame) > self.threshold {
            1.0
        } else {
            0.0
        })
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_not_speech() {
        let mut vad = EnergyDetector::new(0.015);
        let silence = vec![0.0f32; 1600];
        assert_eq!(vad.speech_probability(&silence).unwrap(), 0.0);
    }

    #[test]
    fn empty_frame_is_not_speech() {
        let mut vad = EnergyDetector::new(0.015);
        assert_eq!(vad.speech_probability(&[]).unwrap(), 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        // RMS of a constant signal is its amplitude.
        let mut vad = EnergyDetector::new(0.1);
        assert_eq!(vad.speech_probability(&[0.1; 1600]).unwrap(), 0.0);
        assert_eq!(vad.speech_probability(&[0.101; 1600]).unwrap(), 1.0);
    }

    #[test]
    fn sine_wave_triggers() {
        let mut vad = EnergyDetector::new(0.01);
        let samples: Vec<f32> = (0..1600)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        assert_eq!(vad.speech_probability(&samples).unwrap(), 1.0);
    }
}
