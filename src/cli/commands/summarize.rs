//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::pipeline::Pipeline;
use crate::summarizer::EpisodeSummarizer;
use crate::transcription::WhisperTranscriber;
use anyhow::Result;
use std::sync::Arc;

/// Run the summarize command. Regenerates the episode summary from the
/// stored transcript.
pub async fn run_summarize(guid: &str, settings: Settings) -> Result<()> {
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

    let spinner = Output::spinner("Summarizing episode...");
    let result = pipeline.summarize(guid).await;
    spinner.finish_and_clear();

    let report = result?;

    if report.summarized {
        Output::success(&format!("Updated summary for '{}'.", guid));
    } else {
        Output::warning(&format!(
            "Summary generation failed for '{}'; the stored summary was left unchanged.",
            guid
        ));
    }

    Ok(())
}
