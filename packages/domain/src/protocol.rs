//! Wire records exchanged with the recognition service and local listeners.
//!
//! Outbound audio frames carry an [`AudioMetadata`] header. Inbound traffic is
//! one JSON object per message, decoded into [`ServerMessage`]. Results are
//! republished to local listeners as [`TranslationBroadcast`].

use crate::language::{Language, LanguagePair};
use crate::relay_error::RelayError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the local channel results are republished on.
pub const BROADCAST_CHANNEL: &str = "lucy-v4-channel";

/// Language graph exactly as the server advertised it, in server order.
///
/// Values are left untyped: an entry the client cannot use is dropped when
/// the graph is filtered instead of failing the whole message.
pub type RawLanguagePairs = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AudioTag {
    Audio,
}

/// Header of an outbound audio frame: `{"type":"audio","from_code","to_code"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetadata {
    #[serde(rename = "type")]
    tag: AudioTag,
    pub from_code: Language,
    pub to_code: Language,
}

impl AudioMetadata {
    /// Snapshot a pair into a frame header.
    pub fn new(pair: LanguagePair) -> Self {
        Self {
            tag: AudioTag::Audio,
            from_code: pair.from,
            to_code: pair.to,
        }
    }
}

/// Transcription and/or translation for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl ResultRecord {
    /// Transcription if non-empty.
    pub fn transcription_text(&self) -> Option<&str> {
        self.transcription.as_deref().filter(|text| !text.is_empty())
    }

    /// Translation if non-empty.
    pub fn translation_text(&self) -> Option<&str> {
        self.translation.as_deref().filter(|text| !text.is_empty())
    }

    /// The most specific text available: translation first, then transcription.
    pub fn best_text(&self) -> Option<&str> {
        self.translation_text().or_else(|| self.transcription_text())
    }
}

/// Inbound message from the recognition service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    LanguagePairs { data: RawLanguagePairs },
    Result(ResultRecord),
    Error { message: String },
    /// Any `type` this client does not understand.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Decode one inbound payload.
    ///
    /// Returns `Ok(None)` for JSON values without a string `type` field, which
    /// are ignored like unknown types. Payloads that are not JSON, or that name
    /// a known type with the wrong shape, are `MalformedServerMessage`.
    pub fn parse(payload: &str) -> Result<Option<Self>, RelayError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| RelayError::MalformedServerMessage(e.to_string()))?;
        if value.get("type").and_then(Value::as_str).is_none() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RelayError::MalformedServerMessage(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BroadcastTag {
    Translation,
}

/// Message republished to local listeners for every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationBroadcast {
    #[serde(rename = "type")]
    tag: BroadcastTag,
    pub text: String,
    #[serde(rename = "fromLang")]
    pub from_lang: String,
    #[serde(rename = "toLang")]
    pub to_lang: String,
}

impl TranslationBroadcast {
    pub fn new(
        text: impl Into<String>,
        from_lang: impl Into<String>,
        to_lang: impl Into<String>,
    ) -> Self {
        Self {
            tag: BroadcastTag::Translation,
            text: text.into(),
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
        }
    }
}
