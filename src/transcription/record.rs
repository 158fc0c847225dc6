//! On-disk transcript records.
//!
//! A transcript is written once per episode so re-ingesting can skip the
//! transcription step entirely.

use crate::audio::sanitize_guid;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A persisted episode transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub guid: String,
    pub title: String,
    pub transcript: String,
}

impl TranscriptRecord {
    pub fn new(guid: &str, title: &str, transcript: String) -> Self {
        Self {
            guid: guid.to_string(),
            title: title.to_string(),
            transcript,
        }
    }

    /// File path for an episode's transcript record.
    pub fn path_for(dir: &Path, guid: &str) -> PathBuf {
        dir.join(format!("{}.json", sanitize_guid(guid)))
    }

    pub async fn exists(dir: &Path, guid: &str) -> bool {
        tokio::fs::try_exists(Self::path_for(dir, guid))
            .await
            .unwrap_or(false)
    }

    pub async fn load(dir: &Path, guid: &str) -> Result<Self> {
        let path = Self::path_for(dir, guid);
        let contents = tokio::fs::read_to_string(&path).await?;
        let record = serde_json::from_str(&contents)?;
        debug!("Loaded transcript record from {}", path.display());
        Ok(record)
    }

    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = Self::path_for(dir, &self.guid);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents).await?;
        debug!("Saved transcript record to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let record = TranscriptRecord::new("ep-1", "Pilot", "Hello world.".to_string());

        record.save(dir.path()).await.unwrap();
        assert!(TranscriptRecord::exists(dir.path(), "ep-1").await);

        let loaded = TranscriptRecord::load(dir.path(), "ep-1").await.unwrap();
        assert_eq!(loaded.title, "Pilot");
        assert_eq!(loaded.transcript, "Hello world.");
    }

    #[tokio::test]
    async fn test_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!TranscriptRecord::exists(dir.path(), "nope").await);
        assert!(TranscriptRecord::load(dir.path(), "nope").await.is_err());
    }

    #[test]
    fn test_path_uses_sanitized_guid() {
        let path = TranscriptRecord::path_for(Path::new("/data"), "https://feed/ep?id=1");
        assert_eq!(
            path,
            Path::new("/data/https___feed_ep_id_1.json")
        );
    }
}
