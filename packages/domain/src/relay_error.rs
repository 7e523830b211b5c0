//! Unified error for the relay pipeline.
use thiserror::Error;

/// Top-level error covering capture, segmentation, and transport failures.
///
/// None of these are fatal to the process: each is reported as a status
/// notification where it occurs, and the worst outcome is "not currently
/// transmitting".
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// The speech detector or its runtime asset could not be loaded.
    #[error("voice detection unavailable: {0}")]
    DependencyUnavailable(String),
    /// Microphone access was refused or no capture device could be opened.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    /// A frame could not be sent because the connection is down.
    #[error("connection lost")]
    ConnectionLost,
    /// An inbound payload could not be decoded.
    #[error("malformed server message: {0}")]
    MalformedServerMessage(String),
    /// The server answered with an explicit error message.
    #[error("Server error: {0}")]
    ServerReportedError(String),
    /// A language code outside the directory was selected.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    /// Configuration-related failure reason.
    #[error("configuration: {0}")]
    Configuration(String),
    /// Socket-level failure while connecting or talking to the server.
    #[error("transport: {0}")]
    Transport(String),
    /// Error during audio processing operation
    #[error("audio processing: {0}")]
    AudioProcessing(String),
}
