//! # Voice Relay
//!
//! Captures speech, cuts it into utterances, streams each one to a remote
//! recognition and translation service, and republishes what comes back.
//!
//! The outbound path is audio source → [`VoiceSegmenter`] → [`encode`] →
//! [`build_frame`] → [`ConnectionHandle`]. Inbound messages are routed by the
//! [`InboundDispatcher`] to the [`LanguageDirectory`] or the
//! [`ResultFanOut`]. A [`Session`] holds the shared state and publishes
//! [`SessionEvent`]s for front ends.

pub mod audio_io;
pub mod cli;
pub mod config;
pub mod connection;
pub mod directory;
pub mod dispatch;
pub mod encoder;
pub mod fan_out;
pub mod frame;
pub mod pipeline;
pub mod relay;
pub mod retry;
pub mod session;
pub mod transport;

pub use audio_io::{AudioCapture, AudioSource, WavFileSource};
#[cfg(feature = "microphone")]
pub use audio_io::{MicrophoneSource, list_input_devices};
pub use config::{ConfigError, RelayConfig};
pub use connection::{ConnectionHandle, FrameSink, SendOutcome};
pub use directory::LanguageDirectory;
pub use dispatch::InboundDispatcher;
pub use encoder::{encode, encode_sample};
pub use fan_out::{ResultFanOut, Transcripts, spawn_udp_forwarder};
pub use frame::{WireFrame, build_frame};
pub use pipeline::Pipeline;
pub use relay::Relay;
pub use retry::{ExponentialBackoff, FixedDelay, RetryPolicy};
pub use session::{Controls, Session, SessionEvent, TranscriptKind};
pub use transport::{Connector, Link, TransportEvent, WebSocketConnector};

pub use voice_relay_domain as domain;
pub use voice_relay_vad as vad;
pub use voice_relay_vad::{SegmentEvent, VoiceSegmenter};
