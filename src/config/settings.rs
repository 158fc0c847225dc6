//! Configuration settings for Podgist.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub segmenter: SegmenterSettings,
    pub transcription: TranscriptionSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub retrieval: RetrievalSettings,
    pub summary: SummarySettings,
    pub agent: AgentSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (audio cache, transcripts).
    pub data_dir: String,
    /// Directory for temporary files (audio segments).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.podgist".to_string(),
            temp_dir: "/tmp/podgist".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Audio segmentation limits, matching the transcription provider's
/// per-request ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    /// Maximum segment size in bytes.
    pub max_bytes: u64,
    /// Maximum segment duration in seconds.
    pub max_duration_seconds: f64,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            // Whisper API accepts up to 25 MB per request; stay under it.
            max_bytes: 24 * 1024 * 1024,
            max_duration_seconds: 1200.0,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Primary transcription model.
    pub model: String,
    /// Fallback model tried once when the primary fails.
    pub fallback_model: String,
    /// Segments transcribed concurrently per batch.
    pub batch_size: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            fallback_model: "gpt-4o-mini-transcribe".to_string(),
            batch_size: 3,
        }
    }
}

/// Transcript chunking settings. All budgets are token counts measured
/// with the shared tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunking strategy (fixed, recursive, speaker).
    pub strategy: String,
    /// Token budget per chunk.
    pub chunk_size: usize,
    /// Tokens of carried-over context between chunks.
    pub overlap_size: usize,
    /// Token budget per chunk for speaker-turn chunking.
    pub speaker_chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: "fixed".to_string(),
            chunk_size: 300,
            overlap_size: 50,
            speaker_chunk_size: 7000,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Episode store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.podgist/podgist.db".to_string(),
        }
    }
}

/// Similarity retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Minimum cosine similarity a match must exceed.
    pub threshold: f32,
    /// Maximum number of matches returned.
    pub limit: usize,
    /// Result cap for keyword (substring) search.
    pub keyword_limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            limit: 5,
            keyword_limit: 10,
        }
    }
}

/// Episode summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// Chat model used for summary + guest extraction.
    pub model: String,
    /// Transcript character budget sent to the model.
    pub max_transcript_chars: usize,
    /// Host names to exclude from the extracted guest list.
    pub hosts: Vec<String>,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_transcript_chars: 40_000,
            hosts: Vec::new(),
        }
    }
}

/// Question-answering agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Chat model driving the agent loop.
    pub model: String,
    /// Maximum LLM round trips per question.
    pub max_iterations: usize,
    /// Wall-clock budget for one question, in seconds.
    pub deadline_seconds: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_iterations: 10,
            deadline_seconds: 30,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PodgistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podgist")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory holding per-episode transcript JSON records.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir().join("transcripts")
    }

    /// Directory holding cached episode audio.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 1536);
        assert_eq!(settings.chunking.chunk_size, 300);
        assert_eq!(settings.chunking.overlap_size, 50);
        assert!((settings.retrieval.threshold - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let toml_str = r#"
            [transcription]
            batch_size = 8
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.transcription.batch_size, 8);
        assert_eq!(settings.transcription.model, "whisper-1");
        assert_eq!(settings.chunking.speaker_chunk_size, 7000);
    }
}
