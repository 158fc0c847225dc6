//! OpenAI client configuration with sensible defaults.

use crate::error::{PodgistError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with configured timeout.
///
/// Uses a 5-minute timeout by default to prevent hung API calls.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Fail fast when the OpenAI API key is absent or empty.
///
/// Called before the first external call so a missing credential halts the
/// run with a descriptive message instead of failing mid-pipeline.
pub fn require_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        _ => Err(PodgistError::MissingCredential(
            "OPENAI_API_KEY is not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
