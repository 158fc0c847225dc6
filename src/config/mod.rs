//! Configuration module for Podgist.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, SummaryPrompts};
pub use settings::{
    AgentSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, RetrievalSettings,
    SegmenterSettings, Settings, StoreSettings, SummarySettings, TranscriptionSettings,
};
