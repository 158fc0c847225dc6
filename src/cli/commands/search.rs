//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{RetrievalSettings, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::retrieval::{RetrievalEngine, RetrievalOutcome, NO_MATCH_MESSAGE};
use crate::store::{EpisodeStore, StoredChunk};
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
pub async fn run_search(
    query: &str,
    mode: &str,
    limit: usize,
    threshold: f32,
    settings: Settings,
) -> Result<()> {
    let operation = match mode {
        "keyword" => Operation::Search,
        "chunk" | "episode" => Operation::Ask,
        other => {
            Output::error(&format!(
                "Unknown search mode '{}'. Use chunk, episode, or keyword.",
                other
            ));
            return Err(anyhow::anyhow!("Unknown search mode: {}", other));
        }
    };

    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgist doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = super::build_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding));
    let retrieval_settings = RetrievalSettings {
        threshold,
        limit,
        keyword_limit: limit.max(settings.retrieval.keyword_limit),
    };
    let engine = RetrievalEngine::new(embedder, Arc::clone(&store), retrieval_settings);

    let spinner = Output::spinner("Searching...");

    match mode {
        "chunk" => {
            let outcome = engine.search_chunks(query).await;
            spinner.finish_and_clear();
            match outcome? {
                RetrievalOutcome::NoMatch => Output::warning(NO_MATCH_MESSAGE),
                RetrievalOutcome::Matches(matches) => {
                    Output::success(&format!("Found {} results", matches.len()));
                    for m in &matches {
                        let heading = chunk_heading(store.as_ref(), &m.chunk).await;
                        Output::search_result(&heading, Some(m.score), &m.chunk.content);
                    }
                }
            }
        }
        "episode" => {
            let outcome = engine.search_episodes(query).await;
            spinner.finish_and_clear();
            match outcome? {
                RetrievalOutcome::NoMatch => Output::warning(NO_MATCH_MESSAGE),
                RetrievalOutcome::Matches(matches) => {
                    Output::success(&format!("Found {} episodes", matches.len()));
                    for m in &matches {
                        let summary = m.episode.summary.as_deref().unwrap_or("(no summary)");
                        Output::search_result(&episode_heading(&m.episode), Some(m.score), summary);
                    }
                }
            }
        }
        _ => {
            let chunks = engine.keyword_search(query).await;
            spinner.finish_and_clear();
            let chunks = chunks?;
            if chunks.is_empty() {
                Output::warning(NO_MATCH_MESSAGE);
            } else {
                Output::success(&format!("Found {} results", chunks.len()));
                for chunk in &chunks {
                    let heading = chunk_heading(store.as_ref(), chunk).await;
                    Output::search_result(&heading, None, &chunk.content);
                }
            }
        }
    }

    Ok(())
}

fn episode_heading(episode: &crate::store::Episode) -> String {
    match episode.episode_number {
        Some(number) => format!("#{} {}", number, episode.title),
        None => episode.title.clone(),
    }
}

/// Episode title plus optional speaker, falling back to the guid when the
/// episode row is gone.
async fn chunk_heading(store: &dyn EpisodeStore, chunk: &StoredChunk) -> String {
    let title = match store.find_episode_by_guid(&chunk.episode_guid).await {
        Ok(Some(episode)) => episode.title,
        _ => chunk.episode_guid.clone(),
    };
    match &chunk.speaker {
        Some(speaker) => format!("{} ({})", title, speaker),
        None => title,
    }
}
