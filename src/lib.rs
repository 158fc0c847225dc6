//! Podgist - Podcast Transcription and Retrieval
//!
//! A local-first CLI tool that turns podcast episodes into a searchable,
//! question-answerable archive.
//!
//! # Overview
//!
//! Podgist allows you to:
//! - Download and transcribe podcast episodes, segmenting long audio
//!   under the transcription provider's limits
//! - Build a searchable vector index from episode transcripts
//! - Generate per-episode summaries with guest extraction
//! - Ask questions answered by a tool-calling agent grounded in the archive
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `audio` - Audio fetching, probing, and segmentation
//! - `transcription` - Speech-to-text with batch orchestration and fallback
//! - `chunking` - Token-aware transcript chunking strategies
//! - `embedding` - Embedding generation
//! - `store` - Episode and chunk persistence with similarity search
//! - `retrieval` - Query-time search over chunks and episode summaries
//! - `summarizer` - Episode summary and guest extraction
//! - `agent` - Tool-calling question answering
//! - `pipeline` - End-to-end episode ingestion
//!
//! # Example
//!
//! ```rust,no_run
//! use podgist::config::Settings;
//! use podgist::store::{EpisodeStore, SqliteEpisodeStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = SqliteEpisodeStore::new(&settings.sqlite_path())?;
//!
//!     for episode in store.list_episodes().await? {
//!         println!("{}", episode.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod summarizer;
pub mod transcription;

pub use error::{PodgistError, Result};
