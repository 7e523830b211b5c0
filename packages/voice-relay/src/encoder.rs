//! Float samples to signed 16-bit PCM.

use voice_relay_domain::{PcmBuffer, Utterance};

/// Convert one sample as `clamp(round(x * 32767), -32768, 32767)`.
///
/// Full-scale negative input (`x <= -1`) maps to `i16::MIN`; every other value
/// uses the symmetric scale. NaN maps to silence.
pub fn encode_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    if sample <= -1.0 {
        return i16::MIN;
    }
    (sample.min(1.0) * 32767.0).round() as i16
}

/// Encode a whole utterance. Never fails.
pub fn encode(utterance: &Utterance) -> PcmBuffer {
    PcmBuffer::new(
        utterance
            .samples()
            .iter()
            .copied()
            .map(encode_sample)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_map_to_i16_limits() {
        assert_eq!(encode_sample(1.0), 32767);
        assert_eq!(encode_sample(-1.0), -32768);
        assert_eq!(encode_sample(0.0), 0);
        assert_eq!(encode_sample(-0.0), 0);
    }

    #[test]
    fn out_of_range_and_nan_are_bounded() {
        assert_eq!(encode_sample(7.5), 32767);
        assert_eq!(encode_sample(-3.0), -32768);
        assert_eq!(encode_sample(f32::INFINITY), 32767);
        assert_eq!(encode_sample(f32::NEG_INFINITY), -32768);
        assert_eq!(encode_sample(f32::NAN), 0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(encode_sample(0.5), 16384);
        assert_eq!(encode_sample(-0.5), -16384);
    }

    #[test]
    fn interior_negatives_use_the_symmetric_scale() {
        assert_eq!(encode_sample(-0.6), -19660);
        assert_eq!(encode_sample(0.6), 19660);
        assert_eq!(encode_sample(-0.999_99), -32767);
    }

    #[test]
    fn preserves_length_and_is_deterministic() {
        let utterance = Utterance::from(vec![0.25, -0.25, 1.2, f32::NAN]);
        let first = encode(&utterance);
        assert_eq!(first.len(), 4);
        assert_eq!(first, encode(&utterance));
        assert_eq!(first.samples(), &[8192, -8192, 32767, 0]);
    }
}
