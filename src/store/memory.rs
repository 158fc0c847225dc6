//! In-memory episode store.
//!
//! Useful for tests and small ad-hoc runs.

use super::{
    cosine_similarity, ChunkMatch, Episode, EpisodeMatch, EpisodeStore, StoredChunk,
};
use crate::error::{PodgistError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory episode store.
#[derive(Default)]
pub struct MemoryEpisodeStore {
    episodes: RwLock<HashMap<String, Episode>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EpisodeStore for MemoryEpisodeStore {
    async fn insert_episode(&self, episode: &Episode) -> Result<()> {
        let mut episodes = self.episodes.write().unwrap();
        match episodes.get_mut(&episode.guid) {
            Some(existing) => {
                // Metadata refresh keeps any generated summary.
                existing.title = episode.title.clone();
                existing.episode_number = episode.episode_number;
                existing.published_at = episode.published_at;
                existing.audio_url = episode.audio_url.clone();
                existing.description = episode.description.clone();
            }
            None => {
                episodes.insert(episode.guid.clone(), episode.clone());
            }
        }
        Ok(())
    }

    async fn find_episode_by_guid(&self, guid: &str) -> Result<Option<Episode>> {
        Ok(self.episodes.read().unwrap().get(guid).cloned())
    }

    async fn update_episode_summary(
        &self,
        guid: &str,
        summary: &str,
        guests: &[String],
        embedding: Option<&[f32]>,
    ) -> Result<()> {
        let mut episodes = self.episodes.write().unwrap();
        let episode = episodes
            .get_mut(guid)
            .ok_or_else(|| PodgistError::EpisodeNotFound(guid.to_string()))?;
        episode.summary = Some(summary.to_string());
        episode.guests = guests.to_vec();
        episode.summary_embedding = embedding.map(|e| e.to_vec());
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &StoredChunk) -> Result<()> {
        self.chunks.write().unwrap().push(chunk.clone());
        Ok(())
    }

    async fn delete_chunks_for(&self, guid: &str) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        let before = chunks.len();
        chunks.retain(|c| c.episode_guid != guid);
        Ok(before - chunks.len())
    }

    async fn chunk_count_for(&self, guid: &str) -> Result<usize> {
        Ok(self
            .chunks
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.episode_guid == guid)
            .count())
    }

    async fn query_chunks_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkMatch>> {
        let chunks = self.chunks.read().unwrap();

        let mut results: Vec<ChunkMatch> = chunks
            .iter()
            .map(|chunk| ChunkMatch {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .filter(|m| m.score > threshold)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn query_episodes_by_summary_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<EpisodeMatch>> {
        let episodes = self.episodes.read().unwrap();

        let mut results: Vec<EpisodeMatch> = episodes
            .values()
            .filter_map(|episode| {
                let embedding = episode.summary_embedding.as_deref()?;
                let score = cosine_similarity(query_embedding, embedding);
                Some(EpisodeMatch {
                    episode: episode.clone(),
                    score,
                })
            })
            .filter(|m| m.score > threshold)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<StoredChunk>> {
        let needle = query.to_lowercase();
        let chunks = self.chunks.read().unwrap();

        Ok(chunks
            .iter()
            .filter(|c| c.content.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_episode(&self, guid: &str) -> Result<bool> {
        let removed = self.episodes.write().unwrap().remove(guid).is_some();
        if removed {
            self.chunks
                .write()
                .unwrap()
                .retain(|c| c.episode_guid != guid);
        }
        Ok(removed)
    }

    async fn list_episodes(&self) -> Result<Vec<Episode>> {
        let mut episodes: Vec<Episode> = self.episodes.read().unwrap().values().cloned().collect();
        episodes.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(a.guid.cmp(&b.guid)));
        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemoryEpisodeStore::new();
        store
            .insert_episode(&Episode::new("ep-1", "Pilot"))
            .await
            .unwrap();

        let chunk = StoredChunk::new("ep-1", "hello".to_string(), None, None, None, vec![1.0, 0.0], 0);
        store.insert_chunk(&chunk).await.unwrap();

        let results = store
            .query_chunks_by_similarity(&[1.0, 0.0], 5, 0.1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        assert!(store.delete_episode("ep-1").await.unwrap());
        assert_eq!(store.chunk_count_for("ep-1").await.unwrap(), 0);
    }
}
