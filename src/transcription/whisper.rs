//! OpenAI speech-to-text transcription.

use super::Transcriber;
use crate::error::{PodgistError, Result};
use crate::openai::create_client;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Transcriber backed by the OpenAI audio API, with a fallback model tried
/// when the primary model fails.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    fallback_model: Option<String>,
}

/// Shapes the transcription endpoint is known to return for JSON responses.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptionPayload {
    Text { text: String },
    Transcript { transcript: String },
}

impl WhisperTranscriber {
    pub fn new(model: &str, fallback_model: Option<&str>) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            fallback_model: fallback_model.map(|m| m.to_string()),
        }
    }

    /// Decode a raw transcription response body into plain text.
    ///
    /// Some models return the bare transcript, others a JSON object keyed
    /// by `text` or `transcript`. Anything else is a typed decode error so
    /// the caller can tell a bad response apart from a failed request.
    fn decode_payload(raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let payload: TranscriptionPayload = serde_json::from_str(trimmed).map_err(|_| {
                let excerpt: String = trimmed.chars().take(200).collect();
                PodgistError::UnparsableResponse(format!(
                    "unrecognized response shape: {}",
                    excerpt
                ))
            })?;
            let text = match payload {
                TranscriptionPayload::Text { text } => text,
                TranscriptionPayload::Transcript { transcript } => transcript,
            };
            Ok(text.trim().to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    async fn transcribe_with_model(&self, audio_path: &Path, model: &str) -> Result<String> {
        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| PodgistError::Transcription(format!("Failed to build request: {}", e)))?;

        let raw = self
            .client
            .audio()
            .transcribe_raw(request)
            .await
            .map_err(|e| PodgistError::OpenAI(format!("Transcription API error: {}", e)))?;

        let body = String::from_utf8(raw.to_vec()).map_err(|_| {
            PodgistError::UnparsableResponse("response body was not valid UTF-8".to_string())
        })?;

        Self::decode_payload(&body)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_segment(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio segment with {}", self.model);

        match self.transcribe_with_model(audio_path, &self.model).await {
            Ok(text) => Ok(text),
            Err(primary_err) => match &self.fallback_model {
                Some(fallback) => {
                    warn!(
                        "Primary model {} failed ({}), retrying with {}",
                        self.model, primary_err, fallback
                    );
                    self.transcribe_with_model(audio_path, fallback).await
                }
                None => Err(primary_err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_text() {
        let text = WhisperTranscriber::decode_payload("Hello from the show.\n").unwrap();
        assert_eq!(text, "Hello from the show.");
    }

    #[test]
    fn test_decode_json_text_field() {
        let text = WhisperTranscriber::decode_payload(r#"{"text": "Welcome back."}"#).unwrap();
        assert_eq!(text, "Welcome back.");
    }

    #[test]
    fn test_decode_json_transcript_field() {
        let text =
            WhisperTranscriber::decode_payload(r#"{"transcript": "Another shape."}"#).unwrap();
        assert_eq!(text, "Another shape.");
    }

    #[test]
    fn test_decode_unrecognized_object() {
        let err = WhisperTranscriber::decode_payload(r#"{"words": []}"#).unwrap_err();
        assert!(matches!(err, PodgistError::UnparsableResponse(_)));
    }
}
