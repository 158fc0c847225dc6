//! Audio acquisition and segmentation.
//!
//! Downloads episode audio and splits oversized files into segments that
//! satisfy the transcription provider's per-request size and duration limits.

mod fetch;
mod segment;

pub use fetch::fetch_audio;
pub(crate) use fetch::sanitize_guid;
pub use segment::{plan_segments, probe_media, segment_audio, AudioSegment, MediaInfo, SegmentLimits};
