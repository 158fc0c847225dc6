//! Error types for Podgist.

use thiserror::Error;

/// Library-level error type for Podgist operations.
#[derive(Error, Debug)]
pub enum PodgistError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media probe failed: {0}")]
    MediaProbe(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Unparsable transcription response: {0}")]
    UnparsableResponse(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for Podgist operations.
pub type Result<T> = std::result::Result<T, PodgistError>;
