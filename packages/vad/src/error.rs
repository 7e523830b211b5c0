use thiserror::Error;
use voice_relay_domain::RelayError;

#[derive(Debug, Error)]
pub enum Error {
    /// The detector or its runtime asset could not be loaded.
    #[error("voice detection unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("segmenter used before it was initialized")]
    NotInitialized,

    #[error("speech prediction failed: {0}")]
    PredictionFailed(String),

    #[error("sample rate {sample_rate} is too high for chunk size {chunk_size}")]
    VadConfigError { sample_rate: i64, chunk_size: usize },

    #[error("invalid segmenter configuration: {0}")]
    InvalidConfig(String),
}

impl From<Error> for RelayError {
    fn from(err: Error) -> Self {
        match err {
            Error::DependencyUnavailable(reason) => RelayError::DependencyUnavailable(reason),
            Error::NotInitialized => {
                RelayError::DependencyUnavailable("segmenter not initialized".to_string())
            }
            Error::VadConfigError { .. } | Error::InvalidConfig(_) => {
                RelayError::Configuration(err.to_string())
            }
            Error::PredictionFailed(reason) => RelayError::AudioProcessing(reason),
        }
    }
}
