//! Episode audio download.

use crate::error::{PodgistError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use url::Url;

/// Downloads an episode's audio enclosure and saves it locally.
///
/// A path to an existing local file is accepted as-is. Downloads are
/// cached under the episode guid; if the cached file already exists it is
/// returned without re-downloading.
#[instrument(skip(output_dir), fields(guid = %guid))]
pub async fn fetch_audio(audio_url: &str, guid: &str, output_dir: &Path) -> Result<PathBuf> {
    let local = Path::new(audio_url);
    if local.is_file() {
        info!("Using local audio file");
        return Ok(local.to_path_buf());
    }

    std::fs::create_dir_all(output_dir)?;

    let url = Url::parse(audio_url)
        .map_err(|e| PodgistError::InvalidInput(format!("Invalid audio URL '{}': {}", audio_url, e)))?;

    let ext = extension_from_url(&url);
    let target_path = output_dir.join(format!("{}.{}", sanitize_guid(guid), ext));

    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", audio_url);

    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(PodgistError::AudioDownload(format!(
            "Server returned {} for {}",
            response.status(),
            audio_url
        )));
    }

    // Stream to a temp name first so an interrupted download never leaves a
    // partial file at the cache path.
    let partial_path = target_path.with_extension(format!("{}.part", ext));
    let mut file = tokio::fs::File::create(&partial_path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        file.write_all(&bytes).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial_path, &target_path).await?;

    Ok(target_path)
}

/// Audio file extension from the URL path, defaulting to mp3.
fn extension_from_url(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| matches!(*e, "mp3" | "m4a" | "ogg" | "opus" | "wav" | "aac"))
        .unwrap_or("mp3")
        .to_string()
}

/// Make a guid safe to use as a file name.
pub(crate) fn sanitize_guid(guid: &str) -> String {
    guid.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        let url = Url::parse("https://cdn.example.com/ep/42.m4a?token=abc").unwrap();
        assert_eq!(extension_from_url(&url), "m4a");

        let url = Url::parse("https://cdn.example.com/stream/42").unwrap();
        assert_eq!(extension_from_url(&url), "mp3");
    }

    #[tokio::test]
    async fn test_local_file_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("episode.mp3");
        std::fs::write(&source, b"audio").unwrap();

        let out = dir.path().join("cache");
        let path = fetch_audio(source.to_str().unwrap(), "ep-1", &out)
            .await
            .unwrap();
        assert_eq!(path, source);
    }

    #[test]
    fn test_sanitize_guid() {
        assert_eq!(sanitize_guid("ep-42_final"), "ep-42_final");
        assert_eq!(
            sanitize_guid("https://feed/ep?id=42"),
            "https___feed_ep_id_42"
        );
    }
}
