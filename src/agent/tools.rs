//! Tool definitions and implementations for the agent.

use crate::error::{PodgistError, Result};
use crate::retrieval::{RetrievalEngine, RetrievalOutcome, NO_MATCH_MESSAGE};
use crate::store::EpisodeStore;
use crate::transcription::TranscriptRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Available tools for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Similarity search over transcript chunks.
    SearchChunks {
        query: String,
        #[serde(default = "default_limit")]
        limit: u32,
    },

    /// Similarity search over episode summaries.
    SearchEpisodes { query: String },

    /// Exact substring search over chunk text.
    KeywordSearch { query: String },

    /// Full transcript for one episode.
    GetTranscript { guid: String },

    /// List all ingested episodes.
    ListEpisodes,
}

fn default_limit() -> u32 {
    5
}

/// Tool execution context with access to retrieval and storage.
pub struct ToolContext {
    retrieval: Arc<RetrievalEngine>,
    store: Arc<dyn EpisodeStore>,
    transcripts_dir: PathBuf,
}

impl ToolContext {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        store: Arc<dyn EpisodeStore>,
        transcripts_dir: PathBuf,
    ) -> Self {
        Self {
            retrieval,
            store,
            transcripts_dir,
        }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::SearchChunks { query, limit } => {
                self.execute_search_chunks(query, *limit).await
            }
            ToolCall::SearchEpisodes { query } => self.execute_search_episodes(query).await,
            ToolCall::KeywordSearch { query } => self.execute_keyword_search(query).await,
            ToolCall::GetTranscript { guid } => self.execute_get_transcript(guid).await,
            ToolCall::ListEpisodes => self.execute_list_episodes().await,
        }
    }

    async fn execute_search_chunks(&self, query: &str, limit: u32) -> Result<String> {
        let outcome = self
            .retrieval
            .search_chunks_with(query, limit as usize, self.retrieval.threshold())
            .await?;

        let matches = match outcome {
            RetrievalOutcome::Matches(matches) => matches,
            RetrievalOutcome::NoMatch => return Ok(NO_MATCH_MESSAGE.to_string()),
        };

        let formatted = matches
            .iter()
            .enumerate()
            .map(|(i, m)| {
                format!(
                    "{}. [episode {}] (score {:.2})\n   {}",
                    i + 1,
                    m.chunk.episode_guid,
                    m.score,
                    m.chunk.content.chars().take(500).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(format!("Found {} passages:\n\n{}", matches.len(), formatted))
    }

    async fn execute_search_episodes(&self, query: &str) -> Result<String> {
        let outcome = self.retrieval.search_episodes(query).await?;

        let matches = match outcome {
            RetrievalOutcome::Matches(matches) => matches,
            RetrievalOutcome::NoMatch => return Ok(NO_MATCH_MESSAGE.to_string()),
        };

        let formatted = matches
            .iter()
            .map(|m| {
                format!(
                    "- {} (guid {}, score {:.2})\n  {}",
                    m.episode.title,
                    m.episode.guid,
                    m.score,
                    m.episode.summary.as_deref().unwrap_or("(no summary)")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!("Relevant episodes:\n\n{}", formatted))
    }

    async fn execute_keyword_search(&self, query: &str) -> Result<String> {
        let hits = self.retrieval.keyword_search(query).await?;

        if hits.is_empty() {
            return Ok(NO_MATCH_MESSAGE.to_string());
        }

        let formatted = hits
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{}. [episode {}]\n   {}",
                    i + 1,
                    c.episode_guid,
                    c.content.chars().take(500).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(format!("Exact matches:\n\n{}", formatted))
    }

    async fn execute_get_transcript(&self, guid: &str) -> Result<String> {
        if !TranscriptRecord::exists(&self.transcripts_dir, guid).await {
            return Err(PodgistError::EpisodeNotFound(guid.to_string()));
        }
        let record = TranscriptRecord::load(&self.transcripts_dir, guid).await?;
        Ok(format!("# {}\n\n{}", record.title, record.transcript))
    }

    async fn execute_list_episodes(&self) -> Result<String> {
        let episodes = self.store.list_episodes().await?;

        if episodes.is_empty() {
            return Ok("No episodes ingested yet.".to_string());
        }

        let formatted = episodes
            .iter()
            .map(|e| {
                let number = e
                    .episode_number
                    .map(|n| format!("#{} ", n))
                    .unwrap_or_default();
                format!("- {}{} (guid: {})", number, e.title, e.guid)
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!("Episodes ({}):\n\n{}", episodes.len(), formatted))
    }
}

/// OpenAI function/tool definitions for the agent.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    vec![
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "search_chunks".to_string(),
                description: Some(
                    "Search transcript passages across all episodes by meaning. \
                    Use this to find what was said about a topic."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results (default: 5)",
                            "default": 5
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "search_episodes".to_string(),
                description: Some(
                    "Find whole episodes whose summary matches a topic. \
                    Use this when the user asks which episode covers something."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "keyword_search".to_string(),
                description: Some(
                    "Exact text search over transcripts. Use this for names, \
                    product titles, or quoted phrases when similarity search finds nothing."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The exact term to look for"
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "get_transcript".to_string(),
                description: Some(
                    "Get the full transcript of one episode. Use this when you need \
                    complete context rather than isolated passages."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "guid": {
                            "type": "string",
                            "description": "The episode guid"
                        }
                    },
                    "required": ["guid"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "list_episodes".to_string(),
                description: Some(
                    "List every ingested episode with its guid. \
                    Use this to see what content is available."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {}
                })),
                strict: None,
            },
        },
    ]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| PodgistError::Agent(format!("Invalid tool arguments: {}", e)))?;

    let require_str = |key: &str| -> Result<String> {
        args[key]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PodgistError::Agent(format!("Missing '{}' argument", key)))
    };

    match name {
        "search_chunks" => Ok(ToolCall::SearchChunks {
            query: require_str("query")?,
            limit: args["limit"].as_u64().unwrap_or(5) as u32,
        }),
        "search_episodes" => Ok(ToolCall::SearchEpisodes {
            query: require_str("query")?,
        }),
        "keyword_search" => Ok(ToolCall::KeywordSearch {
            query: require_str("query")?,
        }),
        "get_transcript" => Ok(ToolCall::GetTranscript {
            guid: require_str("guid")?,
        }),
        "list_episodes" => Ok(ToolCall::ListEpisodes),
        _ => Err(PodgistError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_chunks() {
        let tool = parse_tool_call("search_chunks", r#"{"query": "ownership", "limit": 3}"#).unwrap();
        match tool {
            ToolCall::SearchChunks { query, limit } => {
                assert_eq!(query, "ownership");
                assert_eq!(limit, 3);
            }
            _ => panic!("Expected SearchChunks tool"),
        }
    }

    #[test]
    fn test_parse_search_chunks_default_limit() {
        let tool = parse_tool_call("search_chunks", r#"{"query": "ownership"}"#).unwrap();
        match tool {
            ToolCall::SearchChunks { limit, .. } => assert_eq!(limit, 5),
            _ => panic!("Expected SearchChunks tool"),
        }
    }

    #[test]
    fn test_parse_get_transcript() {
        let tool = parse_tool_call("get_transcript", r#"{"guid": "ep-42"}"#).unwrap();
        match tool {
            ToolCall::GetTranscript { guid } => assert_eq!(guid, "ep-42"),
            _ => panic!("Expected GetTranscript tool"),
        }
    }

    #[test]
    fn test_parse_unknown_tool() {
        assert!(parse_tool_call("frobnicate", "{}").is_err());
    }

    #[test]
    fn test_parse_missing_argument() {
        assert!(parse_tool_call("keyword_search", "{}").is_err());
    }

    #[tokio::test]
    async fn test_list_episodes_tool() {
        use crate::config::RetrievalSettings;
        use crate::store::{Episode, MemoryEpisodeStore};
        use crate::embedding::Embedder;
        use async_trait::async_trait;

        struct ZeroEmbedder;

        #[async_trait]
        impl Embedder for ZeroEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![0.0; 3])
            }
            async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
            }
            fn dimensions(&self) -> usize {
                3
            }
        }

        let store = Arc::new(MemoryEpisodeStore::new());
        let mut episode = Episode::new("ep-1", "Pilot");
        episode.episode_number = Some(1);
        store.insert_episode(&episode).await.unwrap();

        let retrieval = Arc::new(RetrievalEngine::new(
            Arc::new(ZeroEmbedder),
            store.clone(),
            RetrievalSettings::default(),
        ));
        let context = ToolContext::new(retrieval, store, PathBuf::from("/tmp"));

        let listing = context.execute(&ToolCall::ListEpisodes).await.unwrap();
        assert!(listing.contains("#1 Pilot"));
        assert!(listing.contains("ep-1"));
    }
}
