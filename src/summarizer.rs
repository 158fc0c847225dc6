//! Episode summarization and guest extraction.

use crate::config::{Prompts, SummarySettings};
use crate::error::{PodgistError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Generated synopsis and guest list for one episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub guests: Vec<String>,
}

/// Produces a short synopsis plus guest list per episode via a chat model.
pub struct EpisodeSummarizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    settings: SummarySettings,
    prompts: Prompts,
}

impl EpisodeSummarizer {
    pub fn new(settings: SummarySettings, prompts: Prompts) -> Self {
        Self {
            client: create_client(),
            settings,
            prompts,
        }
    }

    /// Extract the JSON object from a possibly chatty model response.
    fn parse_summary(response: &str) -> Result<EpisodeSummary> {
        let json_start = response.find('{');
        let json_end = response.rfind('}');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        serde_json::from_str(json_str).map_err(|e| {
            let excerpt: String = response.chars().take(500).collect();
            PodgistError::Summarization(format!(
                "Failed to parse summary response: {}. Response was: {}",
                e, excerpt
            ))
        })
    }

    /// Drop host names from the guest list, case-insensitively.
    fn filter_hosts(&self, guests: Vec<String>) -> Vec<String> {
        let hosts: Vec<String> = self
            .settings
            .hosts
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        guests
            .into_iter()
            .filter(|g| !hosts.contains(&g.trim().to_lowercase()))
            .collect()
    }

    /// Cap the transcript at `max_transcript_chars` characters.
    fn truncate_transcript<'a>(&self, transcript: &'a str) -> &'a str {
        match transcript
            .char_indices()
            .nth(self.settings.max_transcript_chars)
        {
            None => transcript,
            Some((end, _)) => &transcript[..end],
        }
    }

    /// Summarize one episode transcript.
    ///
    /// Summarization is best effort: a model or parse failure degrades to an
    /// empty summary so ingestion of the episode still completes.
    #[instrument(skip(self, transcript), fields(title = %title))]
    pub async fn summarize(&self, title: &str, transcript: &str) -> EpisodeSummary {
        match self.summarize_inner(title, transcript).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summarization failed, continuing without summary: {}", e);
                EpisodeSummary::default()
            }
        }
    }

    async fn summarize_inner(&self, title: &str, transcript: &str) -> Result<EpisodeSummary> {
        let transcript = self.truncate_transcript(transcript.trim());
        if transcript.is_empty() {
            return Ok(EpisodeSummary::default());
        }

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.to_string());
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("hosts".to_string(), self.settings.hosts.join(", "));

        let system_message = self
            .prompts
            .render_with_custom(&self.prompts.summary.system, &vars);
        let user_message = self
            .prompts
            .render_with_custom(&self.prompts.summary.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| PodgistError::Summarization(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| PodgistError::Summarization(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .messages(messages)
            .temperature(0.3)
            .build()
            .map_err(|e| PodgistError::Summarization(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodgistError::OpenAI(format!("Summary API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| PodgistError::Summarization("Empty model response".to_string()))?;

        let mut summary = Self::parse_summary(content)?;
        summary.guests = self.filter_hosts(summary.guests);

        info!(
            "Summarized episode with {} guest(s) identified",
            summary.guests.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizer_with_hosts(hosts: &[&str]) -> EpisodeSummarizer {
        let settings = SummarySettings {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..SummarySettings::default()
        };
        EpisodeSummarizer::new(settings, Prompts::default())
    }

    #[test]
    fn test_parse_summary_bare_json() {
        let parsed = EpisodeSummarizer::parse_summary(
            r#"{"summary": "An episode about Rust.", "guests": ["Jane Doe"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.summary, "An episode about Rust.");
        assert_eq!(parsed.guests, vec!["Jane Doe"]);
    }

    #[test]
    fn test_parse_summary_with_markdown_fences() {
        let response = "Here you go:\n```json\n{\"summary\": \"S.\", \"guests\": []}\n```\n";
        let parsed = EpisodeSummarizer::parse_summary(response).unwrap();
        assert_eq!(parsed.summary, "S.");
    }

    #[test]
    fn test_parse_summary_missing_fields_default() {
        let parsed = EpisodeSummarizer::parse_summary(r#"{"summary": "Only summary."}"#).unwrap();
        assert!(parsed.guests.is_empty());
    }

    #[test]
    fn test_parse_summary_garbage_is_error() {
        assert!(EpisodeSummarizer::parse_summary("not json at all").is_err());
    }

    #[test]
    fn test_filter_hosts_case_insensitive() {
        let summarizer = summarizer_with_hosts(&["Alex Rivera"]);
        let guests = summarizer.filter_hosts(vec![
            "alex rivera".to_string(),
            "Jane Doe".to_string(),
        ]);
        assert_eq!(guests, vec!["Jane Doe"]);
    }

    #[test]
    fn test_truncate_transcript_counts_chars() {
        let settings = SummarySettings {
            max_transcript_chars: 5,
            ..SummarySettings::default()
        };
        let summarizer = EpisodeSummarizer::new(settings, Prompts::default());

        // The multi-byte character counts as one, and the cut never lands
        // inside it.
        let text = "abcdé rest";
        let truncated = summarizer.truncate_transcript(text);
        assert_eq!(truncated, "abcdé");
        assert_eq!(truncated.chars().count(), 5);

        assert_eq!(summarizer.truncate_transcript("short"), "short");
    }
}
