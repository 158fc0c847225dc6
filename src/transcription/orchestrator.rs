//! Batched transcription of segmented episodes.

use super::Transcriber;
use crate::audio::AudioSegment;
use crate::error::Result;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of transcribing a full episode.
#[derive(Debug, Clone)]
pub struct TranscriptionReport {
    /// Segment texts joined in playback order.
    pub transcript: String,
    /// Indexes of segments whose transcription failed.
    pub failed_segments: Vec<usize>,
}

impl TranscriptionReport {
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty()
    }
}

/// Runs segments through a [`Transcriber`] in fixed-size batches.
///
/// Each batch runs concurrently and the next batch starts only once the
/// whole batch has settled, so at most `batch_size` requests are in flight.
pub struct TranscriptionOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    batch_size: usize,
}

impl TranscriptionOrchestrator {
    pub fn new(transcriber: Arc<dyn Transcriber>, batch_size: usize) -> Self {
        Self {
            transcriber,
            batch_size: batch_size.max(1),
        }
    }

    /// Transcribe all segments and join the texts in segment order.
    ///
    /// A failed segment is logged and contributes nothing to the joined
    /// transcript; it never shifts the position of later segments.
    #[instrument(skip(self, segments), fields(segment_count = segments.len()))]
    pub async fn transcribe_all(&self, segments: &[AudioSegment]) -> Result<TranscriptionReport> {
        if segments.is_empty() {
            return Ok(TranscriptionReport {
                transcript: String::new(),
                failed_segments: Vec::new(),
            });
        }

        info!(
            "Transcribing {} segments in batches of {}",
            segments.len(),
            self.batch_size
        );

        let pb = ProgressBar::new(segments.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Transcribe [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let mut texts: Vec<String> = vec![String::new(); segments.len()];
        let mut failed_segments = Vec::new();

        for batch in segments.chunks(self.batch_size) {
            let futures = batch.iter().map(|segment| {
                let transcriber = Arc::clone(&self.transcriber);
                async move {
                    let result = transcriber.transcribe_segment(&segment.path).await;
                    (segment.index, result)
                }
            });

            for (index, result) in join_all(futures).await {
                pb.inc(1);
                match result {
                    Ok(text) => match texts.get_mut(index) {
                        Some(slot) => *slot = text,
                        None => {
                            warn!("Segment index {} is out of range, dropping it", index);
                            failed_segments.push(index);
                        }
                    },
                    Err(e) => {
                        warn!("Segment {} failed, continuing without it: {}", index, e);
                        failed_segments.push(index);
                    }
                }
            }
        }

        pb.finish_and_clear();

        let transcript = texts
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(TranscriptionReport {
            transcript,
            failed_segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PodgistError;
    use crate::transcription::Transcriber;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn segment(index: usize) -> AudioSegment {
        AudioSegment {
            path: PathBuf::from(format!("/tmp/seg-{:03}.mp3", index)),
            index,
            start_seconds: index as f64 * 60.0,
            duration_seconds: 60.0,
        }
    }

    /// Answers with the segment's file name after a delay that is longer
    /// for earlier segments, so completion order inverts submission order.
    struct SlowFirstTranscriber {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowFirstTranscriber {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcriber for SlowFirstTranscriber {
        async fn transcribe_segment(&self, audio_path: &Path) -> Result<String> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let name = audio_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap()
                .to_string();
            let index: usize = name.trim_start_matches("seg-").parse().unwrap();

            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(index as u64 * 5)))
                .await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("text{}", index))
        }
    }

    struct FailingSecond;

    #[async_trait]
    impl Transcriber for FailingSecond {
        async fn transcribe_segment(&self, audio_path: &Path) -> Result<String> {
            let name = audio_path.file_stem().and_then(|s| s.to_str()).unwrap();
            if name.ends_with("001") {
                Err(PodgistError::Transcription("boom".to_string()))
            } else {
                Ok(name.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_results_keep_segment_order() {
        let transcriber = Arc::new(SlowFirstTranscriber::new());
        let orchestrator = TranscriptionOrchestrator::new(transcriber.clone(), 3);

        let segments: Vec<AudioSegment> = (0..6).map(segment).collect();
        let report = orchestrator.transcribe_all(&segments).await.unwrap();

        assert_eq!(
            report.transcript,
            "text0 text1 text2 text3 text4 text5"
        );
        assert!(report.is_complete());
        // Batch boundary caps concurrency.
        assert!(transcriber.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_failed_segment_leaves_gap_not_shift() {
        let orchestrator = TranscriptionOrchestrator::new(Arc::new(FailingSecond), 2);

        let segments: Vec<AudioSegment> = (0..3).map(segment).collect();
        let report = orchestrator.transcribe_all(&segments).await.unwrap();

        assert_eq!(report.transcript, "seg-000 seg-002");
        assert_eq!(report.failed_segments, vec![1]);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_dropped_not_panic() {
        let orchestrator = TranscriptionOrchestrator::new(Arc::new(FailingSecond), 2);

        // A caller-built segment whose index exceeds the list length must not
        // crash the run; its text is dropped and reported as failed.
        let segments = vec![segment(0), segment(7)];

        let report = orchestrator.transcribe_all(&segments).await.unwrap();
        assert_eq!(report.transcript, "seg-000");
        assert_eq!(report.failed_segments, vec![7]);
    }

    #[tokio::test]
    async fn test_empty_segment_list() {
        let orchestrator = TranscriptionOrchestrator::new(Arc::new(FailingSecond), 2);
        let report = orchestrator.transcribe_all(&[]).await.unwrap();
        assert!(report.transcript.is_empty());
        assert!(report.is_complete());
    }
}
