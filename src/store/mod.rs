//! Episode and chunk persistence.
//!
//! Provides a trait-based interface over storage backends. Embeddings live
//! next to their rows and similarity is computed in Rust, which keeps the
//! backend a plain relational store.

mod memory;
mod sqlite;

pub use memory::MemoryEpisodeStore;
pub use sqlite::SqliteEpisodeStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A podcast episode and its derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Feed-level unique identifier.
    pub guid: String,
    pub title: String,
    pub episode_number: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub audio_url: Option<String>,
    pub description: Option<String>,
    /// Generated episode summary, present once summarization has run.
    pub summary: Option<String>,
    /// Guest names extracted during summarization.
    pub guests: Vec<String>,
    /// Embedding of the summary, for episode-level retrieval.
    pub summary_embedding: Option<Vec<f32>>,
}

impl Episode {
    pub fn new(guid: &str, title: &str) -> Self {
        Self {
            guid: guid.to_string(),
            title: title.to_string(),
            episode_number: None,
            published_at: None,
            audio_url: None,
            description: None,
            summary: None,
            guests: Vec::new(),
            summary_embedding: None,
        }
    }
}

/// An embedded transcript chunk as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: Uuid,
    /// Guid of the owning episode.
    pub episode_guid: String,
    pub content: String,
    pub speaker: Option<String>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub embedding: Vec<f32>,
    /// Position of this chunk within the episode transcript.
    pub chunk_order: i32,
    pub indexed_at: DateTime<Utc>,
}

impl StoredChunk {
    pub fn new(
        episode_guid: &str,
        content: String,
        speaker: Option<String>,
        start_seconds: Option<f64>,
        end_seconds: Option<f64>,
        embedding: Vec<f32>,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            episode_guid: episode_guid.to_string(),
            content,
            speaker,
            start_seconds,
            end_seconds,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A chunk matched by similarity search.
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk: StoredChunk,
    /// Cosine similarity against the query (higher is better).
    pub score: f32,
}

/// An episode matched by summary similarity search.
#[derive(Debug, Clone)]
pub struct EpisodeMatch {
    pub episode: Episode,
    pub score: f32,
}

/// Trait for episode storage backends.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Insert an episode, or update its metadata if the guid already exists.
    async fn insert_episode(&self, episode: &Episode) -> Result<()>;

    async fn find_episode_by_guid(&self, guid: &str) -> Result<Option<Episode>>;

    /// Attach a generated summary, guest list, and summary embedding.
    async fn update_episode_summary(
        &self,
        guid: &str,
        summary: &str,
        guests: &[String],
        embedding: Option<&[f32]>,
    ) -> Result<()>;

    async fn insert_chunk(&self, chunk: &StoredChunk) -> Result<()>;

    /// Remove all chunks belonging to an episode. Returns the count removed.
    async fn delete_chunks_for(&self, guid: &str) -> Result<usize>;

    async fn chunk_count_for(&self, guid: &str) -> Result<usize>;

    /// Chunks whose similarity against the query strictly exceeds `threshold`,
    /// best first.
    async fn query_chunks_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkMatch>>;

    /// Episodes whose summary similarity strictly exceeds `threshold`,
    /// best first. Episodes without a summary embedding never match.
    async fn query_episodes_by_summary_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<EpisodeMatch>>;

    /// Case-insensitive substring search over chunk contents.
    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<StoredChunk>>;

    async fn delete_episode(&self, guid: &str) -> Result<bool>;

    /// All episodes, most recently published first.
    async fn list_episodes(&self) -> Result<Vec<Episode>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
