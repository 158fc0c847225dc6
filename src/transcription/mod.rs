//! Audio transcription.
//!
//! A [`Transcriber`] turns one audio segment into text; the
//! [`TranscriptionOrchestrator`] runs segments through it in bounded batches
//! and stitches the results back together in segment order.

mod orchestrator;
mod record;
mod whisper;

pub use orchestrator::{TranscriptionOrchestrator, TranscriptionReport};
pub use record::TranscriptRecord;
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a single audio segment and return its text.
    async fn transcribe_segment(&self, audio_path: &Path) -> Result<String>;
}
