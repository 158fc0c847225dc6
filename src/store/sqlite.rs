//! SQLite-based episode store.
//!
//! Embeddings are stored as little-endian f32 blobs and similarity is
//! computed in Rust. Chunks cascade-delete with their episode.

use super::{
    cosine_similarity, ChunkMatch, Episode, EpisodeMatch, EpisodeStore, StoredChunk,
};
use crate::error::{PodgistError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS episodes (
    guid TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    episode_number INTEGER,
    published_at TEXT,
    audio_url TEXT,
    description TEXT,
    summary TEXT,
    guests_json TEXT NOT NULL DEFAULT '[]',
    summary_embedding BLOB,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    episode_guid TEXT NOT NULL REFERENCES episodes(guid) ON DELETE CASCADE,
    content TEXT NOT NULL,
    speaker TEXT,
    start_seconds REAL,
    end_seconds REAL,
    embedding BLOB NOT NULL,
    chunk_order INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_episode_guid ON chunks(episode_guid);
"#;

/// SQLite-backed episode store.
pub struct SqliteEpisodeStore {
    conn: Mutex<Connection>,
}

impl SqliteEpisodeStore {
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite episode store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, useful for testing.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PodgistError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
        value.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    fn episode_from_row(row: &Row<'_>) -> rusqlite::Result<Episode> {
        let published_at: Option<String> = row.get(3)?;
        let guests_json: String = row.get(7)?;
        let summary_embedding: Option<Vec<u8>> = row.get(8)?;

        Ok(Episode {
            guid: row.get(0)?,
            title: row.get(1)?,
            episode_number: row.get(2)?,
            published_at: Self::parse_datetime(published_at),
            audio_url: row.get(4)?,
            description: row.get(5)?,
            summary: row.get(6)?,
            guests: serde_json::from_str(&guests_json).unwrap_or_default(),
            summary_embedding: summary_embedding.map(|b| Self::bytes_to_embedding(&b)),
        })
    }

    fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<StoredChunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let indexed_at: Option<String> = row.get(8)?;

        Ok(StoredChunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            episode_guid: row.get(1)?,
            content: row.get(2)?,
            speaker: row.get(3)?,
            start_seconds: row.get(4)?,
            end_seconds: row.get(5)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            chunk_order: row.get(7)?,
            indexed_at: Self::parse_datetime(indexed_at).unwrap_or_else(Utc::now),
        })
    }

    fn load_chunks(&self) -> Result<Vec<StoredChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, episode_guid, content, speaker, start_seconds, end_seconds,
                   embedding, chunk_order, indexed_at
            FROM chunks
            "#,
        )?;

        let chunks = stmt.query_map([], Self::chunk_from_row)?;
        Ok(chunks.filter_map(|c| c.ok()).collect())
    }
}

const EPISODE_COLUMNS: &str = "guid, title, episode_number, published_at, audio_url, \
                               description, summary, guests_json, summary_embedding";

#[async_trait]
impl EpisodeStore for SqliteEpisodeStore {
    #[instrument(skip(self, episode), fields(guid = %episode.guid))]
    async fn insert_episode(&self, episode: &Episode) -> Result<()> {
        let conn = self.lock()?;
        let guests_json = serde_json::to_string(&episode.guests)?;

        conn.execute(
            r#"
            INSERT INTO episodes
            (guid, title, episode_number, published_at, audio_url, description,
             summary, guests_json, summary_embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(guid) DO UPDATE SET
                title = excluded.title,
                episode_number = excluded.episode_number,
                published_at = excluded.published_at,
                audio_url = excluded.audio_url,
                description = excluded.description
            "#,
            params![
                episode.guid,
                episode.title,
                episode.episode_number,
                episode.published_at.map(|dt| dt.to_rfc3339()),
                episode.audio_url,
                episode.description,
                episode.summary,
                guests_json,
                episode
                    .summary_embedding
                    .as_deref()
                    .map(Self::embedding_to_bytes),
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Upserted episode {}", episode.guid);
        Ok(())
    }

    async fn find_episode_by_guid(&self, guid: &str) -> Result<Option<Episode>> {
        let conn = self.lock()?;
        let episode = conn
            .query_row(
                &format!("SELECT {} FROM episodes WHERE guid = ?1", EPISODE_COLUMNS),
                params![guid],
                Self::episode_from_row,
            )
            .optional()?;
        Ok(episode)
    }

    #[instrument(skip(self, summary, guests, embedding))]
    async fn update_episode_summary(
        &self,
        guid: &str,
        summary: &str,
        guests: &[String],
        embedding: Option<&[f32]>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let guests_json = serde_json::to_string(guests)?;

        let updated = conn.execute(
            r#"
            UPDATE episodes
            SET summary = ?2, guests_json = ?3, summary_embedding = ?4
            WHERE guid = ?1
            "#,
            params![
                guid,
                summary,
                guests_json,
                embedding.map(Self::embedding_to_bytes),
            ],
        )?;

        if updated == 0 {
            return Err(PodgistError::EpisodeNotFound(guid.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, chunk), fields(episode_guid = %chunk.episode_guid))]
    async fn insert_chunk(&self, chunk: &StoredChunk) -> Result<()> {
        let conn = self.lock()?;
        let embedding_bytes = Self::embedding_to_bytes(&chunk.embedding);

        conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks
            (id, episode_guid, content, speaker, start_seconds, end_seconds,
             embedding, chunk_order, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                chunk.id.to_string(),
                chunk.episode_guid,
                chunk.content,
                chunk.speaker,
                chunk.start_seconds,
                chunk.end_seconds,
                embedding_bytes,
                chunk.chunk_order,
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_chunks_for(&self, guid: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM chunks WHERE episode_guid = ?1", params![guid])?;
        debug!("Deleted {} chunks for episode {}", deleted, guid);
        Ok(deleted)
    }

    async fn chunk_count_for(&self, guid: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE episode_guid = ?1",
            params![guid],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self, query_embedding))]
    async fn query_chunks_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkMatch>> {
        let chunks = self.load_chunks()?;

        let mut results: Vec<ChunkMatch> = chunks
            .into_iter()
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                ChunkMatch { chunk, score }
            })
            .filter(|m| m.score > threshold)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding))]
    async fn query_episodes_by_summary_similarity(
        &self,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<EpisodeMatch>> {
        let episodes = self.list_episodes().await?;

        let mut results: Vec<EpisodeMatch> = episodes
            .into_iter()
            .filter_map(|episode| {
                let embedding = episode.summary_embedding.as_deref()?;
                let score = cosine_similarity(query_embedding, embedding);
                Some(EpisodeMatch { episode, score })
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

    #[instrument(skip(self))]
    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<StoredChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, episode_guid, content, speaker, start_seconds, end_seconds,
                   embedding, chunk_order, indexed_at
            FROM chunks
            WHERE content LIKE '%' || ?1 || '%'
            ORDER BY episode_guid, chunk_order
            LIMIT ?2
            "#,
        )?;

        let chunks = stmt.query_map(params![query, limit as i64], Self::chunk_from_row)?;
        Ok(chunks.filter_map(|c| c.ok()).collect())
    }

    #[instrument(skip(self))]
    async fn delete_episode(&self, guid: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM episodes WHERE guid = ?1", params![guid])?;
        if deleted > 0 {
            info!("Deleted episode {} and its chunks", guid);
        }
        Ok(deleted > 0)
    }

    async fn list_episodes(&self) -> Result<Vec<Episode>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM episodes ORDER BY published_at DESC, guid",
            EPISODE_COLUMNS
        ))?;

        let episodes = stmt.query_map([], Self::episode_from_row)?;
        Ok(episodes.filter_map(|e| e.ok()).collect())
    }
}
