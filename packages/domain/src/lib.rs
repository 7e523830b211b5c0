//! # Voice Relay Domain
//!
//! Shared domain objects and types for the voice-relay pipeline.
//!
//! This crate holds the value types that cross component boundaries: the
//! audio buffers produced by segmentation, the wire-protocol records exchanged
//! with the recognition service, the known-language allow-list, and the error
//! taxonomy. Keeping them here lets the segmenter crate and the relay crate
//! share them without depending on each other.

pub mod audio;
pub mod connection_state;
pub mod language;
pub mod protocol;
pub mod relay_error;
pub mod status;

// Re-export core types
pub use audio::{PcmBuffer, SAMPLE_RATE, Utterance};
pub use connection_state::ConnectionState;
pub use language::{KNOWN_LANGUAGES, Language, LanguagePair};
pub use protocol::{
    AudioMetadata, BROADCAST_CHANNEL, RawLanguagePairs, ResultRecord, ServerMessage,
    TranslationBroadcast,
};
pub use relay_error::RelayError;
pub use status::{Notification, StatusLevel};
