//! Duration/size-bounded audio segmentation.
//!
//! Splits a source file into timestamp-defined segments using ffmpeg stream
//! copy, so segment content is extracted without re-encoding.

use crate::error::{PodgistError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Duration and size of a media file, as reported by ffprobe.
#[derive(Debug, Clone, Copy)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub size_bytes: u64,
}

/// Per-segment ceilings imposed by the transcription provider.
#[derive(Debug, Clone, Copy)]
pub struct SegmentLimits {
    pub max_bytes: u64,
    pub max_duration_seconds: f64,
}

impl MediaInfo {
    /// Whether the file already satisfies both limits.
    pub fn within(&self, limits: &SegmentLimits) -> bool {
        self.size_bytes <= limits.max_bytes && self.duration_seconds <= limits.max_duration_seconds
    }
}

/// A time-bounded slice of an episode's source audio.
///
/// Transient: produced only to satisfy provider limits and deleted with its
/// working directory once transcription completes.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub path: PathBuf,
    pub index: usize,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// Queries duration and size of an audio file using ffprobe with JSON output.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn probe_media(path: &Path) -> Result<MediaInfo> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PodgistError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(PodgistError::MediaProbe(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(PodgistError::MediaProbe(format!(
            "ffprobe returned error for {}",
            path.display()
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| PodgistError::MediaProbe("Invalid ffprobe output".into()))?;

    let duration_seconds = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PodgistError::MediaProbe("Could not determine audio duration".into()))?;

    // ffprobe reports size as a string; fall back to filesystem metadata.
    let size_bytes = match parsed["format"]["size"].as_str().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) => size,
        None => std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|_| PodgistError::MediaProbe("Could not determine audio size".into()))?,
    };

    Ok(MediaInfo {
        duration_seconds,
        size_bytes,
    })
}

/// Compute the segment plan for a file exceeding the limits.
///
/// Segment count is `max(ceil(size/max_bytes), ceil(duration/max_duration))`;
/// segments are equal-duration timestamp ranges covering the full source with
/// no gaps, each at or under the duration ceiling.
pub fn plan_segments(info: &MediaInfo, limits: &SegmentLimits) -> Vec<(f64, f64)> {
    if info.within(limits) {
        return vec![(0.0, info.duration_seconds)];
    }

    let by_size = (info.size_bytes as f64 / limits.max_bytes as f64).ceil() as usize;
    let by_duration = (info.duration_seconds / limits.max_duration_seconds).ceil() as usize;
    let count = by_size.max(by_duration).max(1);

    let segment_len = info.duration_seconds / count as f64;

    (0..count)
        .map(|i| {
            let start = i as f64 * segment_len;
            // Close the last segment exactly at the total duration so float
            // rounding can't leave a sliver uncovered.
            let len = if i == count - 1 {
                info.duration_seconds - start
            } else {
                segment_len
            };
            (start, len)
        })
        .collect()
}

/// Segments a source audio file into provider-sized pieces.
///
/// Files already within both limits are copied into the working directory as
/// a single segment; everything else is split per [`plan_segments`] with
/// ffmpeg stream copy.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn segment_audio(
    source: &Path,
    work_dir: &Path,
    limits: &SegmentLimits,
) -> Result<Vec<AudioSegment>> {
    std::fs::create_dir_all(work_dir)?;

    let info = probe_media(source).await?;
    debug!(
        "Probed {:.1}s / {} bytes (limits {:.0}s / {} bytes)",
        info.duration_seconds, info.size_bytes, limits.max_duration_seconds, limits.max_bytes
    );

    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3");
    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    if info.within(limits) {
        let dest = work_dir.join(format!("{}_0000.{}", base_name, ext));
        tokio::fs::copy(source, &dest).await?;
        return Ok(vec![AudioSegment {
            path: dest,
            index: 0,
            start_seconds: 0.0,
            duration_seconds: info.duration_seconds,
        }]);
    }

    let plan = plan_segments(&info, limits);
    info!("Splitting into {} segments of ~{:.0}s", plan.len(), plan[0].1);

    let mut segments = Vec::with_capacity(plan.len());
    for (index, (start, length)) in plan.into_iter().enumerate() {
        let dest = work_dir.join(format!("{}_{:04}.{}", base_name, index, ext));
        extract_segment(source, &dest, start, length).await?;
        debug!("Created segment {} at offset {:.1}s", index, start);

        segments.push(AudioSegment {
            path: dest,
            index,
            start_seconds: start,
            duration_seconds: length,
        });
    }

    Ok(segments)
}

/// Extracts a time segment from an audio file via stream copy.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() && dest.exists() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(PodgistError::ToolFailed(format!(
                "Segment extraction failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PodgistError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(PodgistError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn limits(max_mb: u64, max_secs: f64) -> SegmentLimits {
        SegmentLimits {
            max_bytes: max_mb * MB,
            max_duration_seconds: max_secs,
        }
    }

    #[test]
    fn test_within_limits_single_segment() {
        let info = MediaInfo {
            duration_seconds: 300.0,
            size_bytes: 2 * MB,
        };
        let plan = plan_segments(&info, &limits(5, 600.0));
        assert_eq!(plan, vec![(0.0, 300.0)]);
    }

    #[test]
    fn test_size_bound_dominates() {
        // 40 MB at 5 MB max gives 8 by size; 3000s at 600s max gives 5 by
        // duration; expect max(8, 5) = 8 segments of ~375s.
        let info = MediaInfo {
            duration_seconds: 3000.0,
            size_bytes: 40 * MB,
        };
        let plan = plan_segments(&info, &limits(5, 600.0));
        assert_eq!(plan.len(), 8);
        for (_, len) in &plan {
            assert!((*len - 375.0).abs() < 0.01);
            assert!(*len <= 600.0);
        }
    }

    #[test]
    fn test_duration_bound_dominates() {
        let info = MediaInfo {
            duration_seconds: 2500.0,
            size_bytes: 6 * MB,
        };
        let plan = plan_segments(&info, &limits(5, 600.0));
        // ceil(6/5)=2 by size, ceil(2500/600)=5 by duration.
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_plan_covers_source_without_gaps() {
        let info = MediaInfo {
            duration_seconds: 3333.7,
            size_bytes: 100 * MB,
        };
        let plan = plan_segments(&info, &limits(5, 600.0));

        let mut cursor = 0.0;
        for (start, len) in &plan {
            assert!((start - cursor).abs() < 1e-6, "gap or overlap at {}", start);
            cursor = start + len;
            assert!(*len <= 600.0 + 1e-6);
        }
        assert!((cursor - info.duration_seconds).abs() < 1e-6);
    }
}
