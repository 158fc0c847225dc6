//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = super::build_store(&settings)?;

    let episodes = store.list_episodes().await?;

    if episodes.is_empty() {
        Output::info("No episodes indexed yet. Use 'podgist ingest <url>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Indexed Episodes ({})", episodes.len()));
    println!();

    let mut total_chunks = 0;
    for episode in &episodes {
        let chunk_count = store.chunk_count_for(&episode.guid).await?;
        total_chunks += chunk_count;

        let number = episode
            .episode_number
            .map(|n| format!("#{} ", n))
            .unwrap_or_default();
        let summary_marker = if episode.summary.is_some() {
            ""
        } else {
            " [no summary]"
        };
        Output::list_item(&format!(
            "{}{} ({}, {} chunks){}",
            number, episode.title, episode.guid, chunk_count, summary_marker
        ));
    }

    println!();
    Output::kv("Total episodes", &episodes.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
