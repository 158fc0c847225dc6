//! End-to-end episode ingestion.
//!
//! Fetch audio, segment it under provider limits, transcribe, chunk, embed,
//! persist, summarize. Episodes are processed one at a time; parallelism
//! lives inside the transcription batches.

use crate::audio::{fetch_audio, segment_audio, SegmentLimits};
use crate::chunking::{create_chunker, ChunkingStrategy, TokenCounter, TranscriptChunk};
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{PodgistError, Result};
use crate::store::{Episode, EpisodeStore, StoredChunk};
use crate::summarizer::EpisodeSummarizer;
use crate::transcription::{Transcriber, TranscriptRecord, TranscriptionOrchestrator};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What happened while processing one episode.
#[derive(Debug, Default, Clone)]
pub struct ProcessReport {
    pub guid: String,
    pub segment_count: usize,
    pub failed_segments: usize,
    pub chunk_count: usize,
    pub failed_chunks: usize,
    pub summarized: bool,
    /// True when an existing transcript record was reused.
    pub transcript_reused: bool,
    /// True when the episode was already ingested and left untouched.
    pub skipped: bool,
}

/// Orchestrates the full ingestion flow for single episodes.
pub struct Pipeline {
    settings: Settings,
    store: Arc<dyn EpisodeStore>,
    embedder: Arc<dyn Embedder>,
    orchestrator: TranscriptionOrchestrator,
    summarizer: EpisodeSummarizer,
    counter: TokenCounter,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        store: Arc<dyn EpisodeStore>,
        embedder: Arc<dyn Embedder>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: EpisodeSummarizer,
    ) -> Result<Self> {
        let orchestrator =
            TranscriptionOrchestrator::new(transcriber, settings.transcription.batch_size);
        let counter = TokenCounter::new()?;

        Ok(Self {
            settings,
            store,
            embedder,
            orchestrator,
            summarizer,
            counter,
        })
    }

    /// Ingest one episode end to end.
    ///
    /// With `force` false, an episode that already has chunks is skipped and
    /// an existing transcript record short-circuits the audio work.
    #[instrument(skip(self, episode), fields(guid = %episode.guid))]
    pub async fn ingest(&self, episode: &Episode, force: bool) -> Result<ProcessReport> {
        self.store.insert_episode(episode).await?;

        if !force && self.store.chunk_count_for(&episode.guid).await? > 0 {
            info!("Episode {} already ingested, skipping", episode.guid);
            return Ok(ProcessReport {
                guid: episode.guid.clone(),
                chunk_count: self.store.chunk_count_for(&episode.guid).await?,
                skipped: true,
                ..ProcessReport::default()
            });
        }

        let transcripts_dir = self.settings.transcripts_dir();
        let mut report = ProcessReport {
            guid: episode.guid.clone(),
            ..ProcessReport::default()
        };

        let transcript = if !force && TranscriptRecord::exists(&transcripts_dir, &episode.guid).await
        {
            info!("Reusing existing transcript for {}", episode.guid);
            report.transcript_reused = true;
            TranscriptRecord::load(&transcripts_dir, &episode.guid)
                .await?
                .transcript
        } else {
            self.transcribe_episode(episode, &mut report).await?
        };

        if transcript.trim().is_empty() {
            warn!("Episode {} produced an empty transcript", episode.guid);
            return Ok(report);
        }

        self.index_transcript(&episode.guid, &transcript, &mut report)
            .await?;
        self.summarize_episode(&episode.guid, &episode.title, &transcript, &mut report)
            .await;
        Ok(report)
    }

    /// Re-run chunking, embedding, and persistence from the stored
    /// transcript, without touching audio. The episode summary is left as is.
    #[instrument(skip(self))]
    pub async fn rechunk(&self, guid: &str) -> Result<ProcessReport> {
        let transcripts_dir = self.settings.transcripts_dir();
        if !TranscriptRecord::exists(&transcripts_dir, guid).await {
            return Err(PodgistError::EpisodeNotFound(guid.to_string()));
        }

        let record = TranscriptRecord::load(&transcripts_dir, guid).await?;
        let mut report = ProcessReport {
            guid: guid.to_string(),
            transcript_reused: true,
            ..ProcessReport::default()
        };

        self.index_transcript(guid, &record.transcript, &mut report)
            .await?;
        Ok(report)
    }

    /// Regenerate the summary for an already transcribed episode.
    #[instrument(skip(self))]
    pub async fn summarize(&self, guid: &str) -> Result<ProcessReport> {
        let transcripts_dir = self.settings.transcripts_dir();
        if !TranscriptRecord::exists(&transcripts_dir, guid).await {
            return Err(PodgistError::EpisodeNotFound(guid.to_string()));
        }

        let record = TranscriptRecord::load(&transcripts_dir, guid).await?;
        let mut report = ProcessReport {
            guid: guid.to_string(),
            transcript_reused: true,
            ..ProcessReport::default()
        };

        self.summarize_episode(guid, &record.title, &record.transcript, &mut report)
            .await;
        Ok(report)
    }

    async fn transcribe_episode(
        &self,
        episode: &Episode,
        report: &mut ProcessReport,
    ) -> Result<String> {
        let audio_url = episode.audio_url.as_deref().ok_or_else(|| {
            PodgistError::InvalidInput(format!("Episode {} has no audio url", episode.guid))
        })?;

        let audio_path =
            fetch_audio(audio_url, &episode.guid, &self.settings.audio_dir()).await?;

        let temp_root = self.settings.temp_dir();
        std::fs::create_dir_all(&temp_root)?;
        let work_dir = tempfile::tempdir_in(&temp_root)?;

        let limits = SegmentLimits {
            max_bytes: self.settings.segmenter.max_bytes,
            max_duration_seconds: self.settings.segmenter.max_duration_seconds,
        };
        let segments = segment_audio(&audio_path, work_dir.path(), &limits).await?;
        report.segment_count = segments.len();

        let transcription = self.orchestrator.transcribe_all(&segments).await?;
        report.failed_segments = transcription.failed_segments.len();

        // Segment files are no longer needed.
        drop(work_dir);

        let record = TranscriptRecord::new(
            &episode.guid,
            &episode.title,
            transcription.transcript.clone(),
        );
        record.save(&self.settings.transcripts_dir()).await?;

        Ok(transcription.transcript)
    }

    async fn index_transcript(
        &self,
        guid: &str,
        transcript: &str,
        report: &mut ProcessReport,
    ) -> Result<()> {
        let strategy: ChunkingStrategy = self
            .settings
            .chunking
            .strategy
            .parse()
            .map_err(PodgistError::Config)?;
        let chunker = create_chunker(strategy, &self.settings.chunking, self.counter.clone());

        let chunks = chunker.chunk(transcript)?;
        if chunks.is_empty() {
            warn!("Chunking produced no chunks for {}", guid);
            return Ok(());
        }

        // One batched call for the whole episode; a failure here skips the
        // episode and leaves it retryable on the next run.
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        // Chunk boundaries shift with strategy and parameters, so replace
        // the whole set instead of merging.
        self.store.delete_chunks_for(guid).await?;

        for (order, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let stored = stored_chunk(guid, chunk, embedding, order as i32);
            if let Err(e) = self.store.insert_chunk(&stored).await {
                warn!("Failed to persist chunk {} of {}: {}", order, guid, e);
                report.failed_chunks += 1;
            } else {
                report.chunk_count += 1;
            }
        }

        info!(
            "Indexed {} chunks for {} ({} failed)",
            report.chunk_count, guid, report.failed_chunks
        );
        Ok(())
    }

    /// Best effort: a failed summary never fails the episode.
    async fn summarize_episode(
        &self,
        guid: &str,
        title: &str,
        transcript: &str,
        report: &mut ProcessReport,
    ) {
        let summary = self.summarizer.summarize(title, transcript).await;
        if summary.summary.is_empty() {
            return;
        }

        let embedding = match self.embedder.embed(&summary.summary).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Failed to embed summary for {}: {}", guid, e);
                None
            }
        };

        match self
            .store
            .update_episode_summary(guid, &summary.summary, &summary.guests, embedding.as_deref())
            .await
        {
            Ok(()) => report.summarized = true,
            Err(e) => warn!("Failed to store summary for {}: {}", guid, e),
        }
    }
}

fn stored_chunk(
    guid: &str,
    chunk: &TranscriptChunk,
    embedding: Vec<f32>,
    order: i32,
) -> StoredChunk {
    StoredChunk::new(
        guid,
        chunk.content.clone(),
        chunk.speaker.clone(),
        chunk.start_seconds,
        chunk.end_seconds,
        embedding,
        order,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::store::MemoryEpisodeStore;
    use async_trait::async_trait;
    use std::path::Path;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    struct NoopTranscriber;

    #[async_trait]
    impl Transcriber for NoopTranscriber {
        async fn transcribe_segment(&self, _audio_path: &Path) -> Result<String> {
            Ok("unused".to_string())
        }
    }

    fn pipeline_with_dirs(dir: &Path) -> Pipeline {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.to_string_lossy().to_string();
        settings.general.temp_dir = dir.join("tmp").to_string_lossy().to_string();

        let store = Arc::new(MemoryEpisodeStore::new());
        let summarizer = EpisodeSummarizer::new(
            settings.summary.clone(),
            crate::config::Prompts::default(),
        );
        Pipeline::new(
            settings,
            store,
            Arc::new(UnitEmbedder),
            Arc::new(NoopTranscriber),
            summarizer,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rechunk_missing_transcript_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with_dirs(dir.path());

        let err = pipeline.rechunk("missing").await.unwrap_err();
        assert!(matches!(err, PodgistError::EpisodeNotFound(_)));
    }

    #[tokio::test]
    async fn test_rechunk_indexes_existing_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with_dirs(dir.path());

        let record = TranscriptRecord::new(
            "ep-1",
            "Pilot",
            "A short transcript about nothing in particular.".to_string(),
        );
        record
            .save(&pipeline.settings.transcripts_dir())
            .await
            .unwrap();
        pipeline
            .store
            .insert_episode(&Episode::new("ep-1", "Pilot"))
            .await
            .unwrap();

        let report = pipeline.rechunk("ep-1").await.unwrap();
        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.failed_chunks, 0);
        assert!(report.transcript_reused);
        assert_eq!(pipeline.store.chunk_count_for("ep-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rechunk_replaces_previous_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with_dirs(dir.path());

        let record = TranscriptRecord::new("ep-1", "Pilot", "Same text each run.".to_string());
        record
            .save(&pipeline.settings.transcripts_dir())
            .await
            .unwrap();
        pipeline
            .store
            .insert_episode(&Episode::new("ep-1", "Pilot"))
            .await
            .unwrap();

        pipeline.rechunk("ep-1").await.unwrap();
        pipeline.rechunk("ep-1").await.unwrap();

        // Two runs must not duplicate chunks.
        assert_eq!(pipeline.store.chunk_count_for("ep-1").await.unwrap(), 1);
    }
}
