//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::pipeline::Pipeline;
use crate::store::Episode;
use crate::summarizer::EpisodeSummarizer;
use crate::transcription::WhisperTranscriber;
use anyhow::Result;
use std::sync::Arc;

/// Run the ingest command.
pub async fn run_ingest(
    url: &str,
    guid: &str,
    title: &str,
    number: Option<i64>,
    force: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgist doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    Output::info(&format!("Processing: {}", title));

    let store = super::build_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding));
    let transcriber = Arc::new(WhisperTranscriber::new(
        &settings.transcription.model,
        Some(&settings.transcription.fallback_model),
    ));
    let prompts = Prompts::load(None, None)?;
    let summarizer = EpisodeSummarizer::new(settings.summary.clone(), prompts);

    let pipeline = Pipeline::new(settings, store, embedder, transcriber, summarizer)?;

    let mut episode = Episode::new(guid, title);
    episode.episode_number = number;
    episode.audio_url = Some(url.to_string());

    let report = pipeline.ingest(&episode, force).await?;

    if report.skipped {
        Output::warning(&format!(
            "'{}' is already indexed. Use --force to reprocess.",
            title
        ));
        return Ok(());
    }

    if report.transcript_reused {
        Output::info("Reused stored transcript.");
    } else {
        Output::info(&format!(
            "Transcribed {} segment(s){}",
            report.segment_count,
            if report.failed_segments > 0 {
                format!(", {} failed", report.failed_segments)
            } else {
                String::new()
            }
        ));
    }

    if report.chunk_count == 0 {
        Output::warning("Transcript was empty; nothing was indexed.");
        return Ok(());
    }

    if report.failed_chunks > 0 {
        Output::warning(&format!("{} chunk(s) failed to persist", report.failed_chunks));
    }
    if !report.summarized {
        Output::warning("Summary generation failed; episode indexed without a summary.");
    }

    Output::success(&format!(
        "Successfully indexed '{}' ({} chunks)",
        title, report.chunk_count
    ));

    Ok(())
}
