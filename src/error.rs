use thiserror::Error;

/// Failures surfaced by the summary / transcript / chat pipeline.
///
/// The `Display` text of each variant is what ends up in a session's
/// per-action error state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Please add your Google AI Studio API key to continue.")]
    NoApiKey,

    #[error("Please paste a Google AI Studio API key to continue.")]
    EmptyApiKey,

    #[error("Unable to detect the current video.")]
    NoVideoDetected,

    #[error("Transcript was empty for this video.")]
    EmptyTranscript,

    #[error("{0}")]
    TranscriptFetchFailed(String),

    #[error("caption track unavailable: {0}")]
    Caption(String),

    #[error("Gemini returned an empty response.")]
    EmptyResponse,

    #[error("{0}")]
    GenerationFailed(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("API key validation timed out. Please try again.")]
    ValidationTimeout,

    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
