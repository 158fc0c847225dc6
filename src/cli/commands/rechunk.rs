//! Rechunk command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::pipeline::Pipeline;
use crate::summarizer::EpisodeSummarizer;
use crate::transcription::WhisperTranscriber;
use anyhow::Result;
use std::sync::Arc;

/// Run the rechunk command. Rebuilds chunks and embeddings from the stored
/// transcript with the currently configured chunking strategy.
pub async fn run_rechunk(guid: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgist doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = super::build_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding));
    let transcriber = Arc::new(WhisperTranscriber::new(
        &settings.transcription.model,
        Some(&settings.transcription.fallback_model),
    ));
    let prompts = Prompts::load(None, None)?;
    let summarizer = EpisodeSummarizer::new(settings.summary.clone(), prompts);

    let pipeline = Pipeline::new(settings, store, embedder, transcriber, summarizer)?;

    let spinner = Output::spinner("Rechunking from stored transcript...");
    let result = pipeline.rechunk(guid).await;
    spinner.finish_and_clear();

    let report = result?;

    if report.failed_chunks > 0 {
        Output::warning(&format!("{} chunk(s) failed to persist", report.failed_chunks));
    }
    Output::success(&format!(
        "Rechunked '{}' ({} chunks)",
        guid, report.chunk_count
    ));

    Ok(())
}
