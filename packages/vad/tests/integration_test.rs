use voice_relay_vad::{DetectorBackend, SegmentEvent, SegmenterConfig, VoiceSegmenter};

const RATE: f32 = 16000.0;

fn tone(samples: usize, amplitude: f32) -> Vec<f32> {
    (0..samples)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / RATE).sin() * amplitude)
        .collect()
}

fn started_segmenter(config: SegmenterConfig) -> VoiceSegmenter {
    let mut segmenter =
        VoiceSegmenter::new(config, DetectorBackend::default()).expect("Failed to build segmenter");
    segmenter.init().expect("Failed to init segmenter");
    segmenter.start().expect("Failed to start segmenter");
    segmenter
}

#[test]
fn test_segmenter_emits_one_utterance_per_spoken_phrase() {
    let config = SegmenterConfig::default();
    let frame = config.frame_samples;
    let mut segmenter = started_segmenter(config);

    // Silence, ~0.5 s of tone, then enough silence to exhaust redemption.
    let mut audio = vec![0.0f32; frame * 3];
    audio.extend(tone(frame * 5, 0.3));
    audio.extend(vec![0.0f32; frame * (config.redemption_frames + 2)]);

    let mut events = Vec::new();
    // Feed in capture-sized chunks that do not line up with frames.
    for chunk in audio.chunks(1000) {
        events.extend(segmenter.process(chunk).expect("Failed to process chunk"));
    }

    assert_eq!(events.len(), 2, "unexpected events: {events:?}");
    assert_eq!(events[0], SegmentEvent::SpeechStart);
    let SegmentEvent::SpeechEnd(utterance) = &events[1] else {
        panic!("expected speech end, got {:?}", events[1]);
    };
    let expected_frames = config.pre_speech_pad_frames + 5 + config.redemption_frames;
    assert_eq!(utterance.len(), expected_frames * frame);
}

#[test]
fn test_segmenter_reports_misfire_for_clicks() {
    let config = SegmenterConfig::default();
    let frame = config.frame_samples;
    let mut segmenter = started_segmenter(config);

    let mut audio = tone(frame, 0.5);
    audio.extend(vec![0.0f32; frame * config.redemption_frames]);

    let events = segmenter.process(&audio).expect("Failed to process");
    assert_eq!(events, vec![SegmentEvent::SpeechStart, SegmentEvent::Misfire]);
}

#[test]
fn test_segmenter_resumes_after_pause_without_reinit() {
    let config = SegmenterConfig::default();
    let frame = config.frame_samples;
    let mut segmenter = started_segmenter(config);

    segmenter.process(&tone(frame * 2, 0.3)).expect("process");
    segmenter.pause();
    segmenter.start().expect("Failed to restart segmenter");

    // Speech collected before the pause was discarded, so a fresh start is reported.
    let events = segmenter.process(&tone(frame, 0.3)).expect("process");
    assert_eq!(events, vec![SegmentEvent::SpeechStart]);
}

#[test]
fn test_silero_backend_without_model_fails_to_init() {
    let backend = DetectorBackend::Silero {
        model_path: "/nonexistent/silero_vad.onnx".into(),
    };
    let mut segmenter =
        VoiceSegmenter::new(SegmenterConfig::default(), backend).expect("Failed to build");
    let err = segmenter.init().expect_err("init should fail without a model");
    assert!(err.to_string().contains("voice detection unavailable"));
    assert!(!segmenter.is_initialized());
}
