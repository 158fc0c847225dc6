//! Similarity-based retrieval over stored chunks and episode summaries.

use crate::config::RetrievalSettings;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::{ChunkMatch, EpisodeMatch, EpisodeStore, StoredChunk};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Message returned to callers when nothing clears the threshold.
pub const NO_MATCH_MESSAGE: &str = "No relevant content found";

/// Outcome of a similarity query. An empty corpus or a query with no match
/// above the threshold is a normal result, not an error.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome<T> {
    Matches(Vec<T>),
    NoMatch,
}

impl<T> RetrievalOutcome<T> {
    fn from_matches(matches: Vec<T>) -> Self {
        if matches.is_empty() {
            RetrievalOutcome::NoMatch
        } else {
            RetrievalOutcome::Matches(matches)
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, RetrievalOutcome::NoMatch)
    }
}

/// Embeds queries and ranks stored vectors against them.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EpisodeStore>,
    settings: RetrievalSettings,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EpisodeStore>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    /// Configured similarity threshold.
    pub fn threshold(&self) -> f32 {
        self.settings.threshold
    }

    /// Collapse newlines and runs of whitespace to single spaces.
    fn normalize_query(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Find transcript chunks similar to the query.
    #[instrument(skip(self))]
    pub async fn search_chunks(&self, query: &str) -> Result<RetrievalOutcome<ChunkMatch>> {
        self.search_chunks_with(query, self.settings.limit, self.settings.threshold)
            .await
    }

    /// Chunk search with explicit limit and threshold overrides.
    pub async fn search_chunks_with(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<RetrievalOutcome<ChunkMatch>> {
        let normalized = Self::normalize_query(query);
        let embedding = self.embedder.embed(&normalized).await?;

        let matches = self
            .store
            .query_chunks_by_similarity(&embedding, limit, threshold)
            .await?;

        debug!("Chunk search returned {} matches", matches.len());
        Ok(RetrievalOutcome::from_matches(matches))
    }

    /// Find episodes whose summary is similar to the query.
    #[instrument(skip(self))]
    pub async fn search_episodes(&self, query: &str) -> Result<RetrievalOutcome<EpisodeMatch>> {
        let normalized = Self::normalize_query(query);
        let embedding = self.embedder.embed(&normalized).await?;

        let matches = self
            .store
            .query_episodes_by_summary_similarity(
                &embedding,
                self.settings.limit,
                self.settings.threshold,
            )
            .await?;

        debug!("Episode search returned {} matches", matches.len());
        Ok(RetrievalOutcome::from_matches(matches))
    }

    /// Exact-term fallback: substring match over chunk text, existence
    /// filtered and capped, never similarity ranked.
    #[instrument(skip(self))]
    pub async fn keyword_search(&self, query: &str) -> Result<Vec<StoredChunk>> {
        self.store
            .keyword_search(query.trim(), self.settings.keyword_limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Episode, MemoryEpisodeStore, StoredChunk};
    use async_trait::async_trait;

    /// Maps known phrases to fixed unit vectors.
    struct PhraseEmbedder;

    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        if lower.contains("rust") {
            vec![1.0, 0.0, 0.0]
        } else if lower.contains("garden") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        }
    }

    #[async_trait]
    impl Embedder for PhraseEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vector_for(t)).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    async fn engine_with_corpus() -> RetrievalEngine {
        let store = Arc::new(MemoryEpisodeStore::new());
        store
            .insert_episode(&Episode::new("ep-1", "Pilot"))
            .await
            .unwrap();
        store
            .insert_chunk(&StoredChunk::new(
                "ep-1",
                "All about rust lifetimes".to_string(),
                None,
                None,
                None,
                vec![0.95, 0.05, 0.0],
                0,
            ))
            .await
            .unwrap();
        store
            .insert_chunk(&StoredChunk::new(
                "ep-1",
                "Spring gardening tips".to_string(),
                None,
                None,
                None,
                vec![0.0, 1.0, 0.0],
                1,
            ))
            .await
            .unwrap();

        RetrievalEngine::new(
            Arc::new(PhraseEmbedder),
            store,
            RetrievalSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_nearest_chunk_ranks_first() {
        let engine = engine_with_corpus().await;

        match engine.search_chunks("tell me about rust").await.unwrap() {
            RetrievalOutcome::Matches(matches) => {
                assert_eq!(matches[0].chunk.content, "All about rust lifetimes");
                assert!(matches[0].score > 0.1);
            }
            RetrievalOutcome::NoMatch => panic!("expected matches"),
        }
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_sentinel() {
        let engine = RetrievalEngine::new(
            Arc::new(PhraseEmbedder),
            Arc::new(MemoryEpisodeStore::new()),
            RetrievalSettings::default(),
        );

        let outcome = engine.search_chunks("anything").await.unwrap();
        assert!(outcome.is_no_match());
    }

    #[tokio::test]
    async fn test_orthogonal_query_returns_sentinel() {
        let engine = engine_with_corpus().await;
        // "weather" maps to a vector orthogonal to every stored chunk.
        let outcome = engine.search_chunks("weather").await.unwrap();
        assert!(outcome.is_no_match());
    }

    #[tokio::test]
    async fn test_keyword_search_exact_terms() {
        let engine = engine_with_corpus().await;
        let hits = engine.keyword_search("gardening").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("gardening"));
    }

    #[test]
    fn test_normalize_query_flattens_newlines() {
        let normalized = RetrievalEngine::normalize_query("line one\nline  two\n");
        assert_eq!(normalized, "line one line two");
    }
}
