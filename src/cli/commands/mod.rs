//! CLI command implementations.

mod ask;
mod config;
mod delete;
mod doctor;
mod ingest;
mod list;
mod rechunk;
mod search;
mod summarize;

pub use ask::run_ask;
pub use config::run_config;
pub use delete::run_delete;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use list::run_list;
pub use rechunk::run_rechunk;
pub use search::run_search;
pub use summarize::run_summarize;

use crate::config::Settings;
use crate::store::{EpisodeStore, MemoryEpisodeStore, SqliteEpisodeStore};
use anyhow::Result;
use std::sync::Arc;

/// Build the configured episode store backend.
pub(crate) fn build_store(settings: &Settings) -> Result<Arc<dyn EpisodeStore>> {
    match settings.store.provider.as_str() {
        "memory" => Ok(Arc::new(MemoryEpisodeStore::new())),
        "sqlite" => {
            let path = settings.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteEpisodeStore::new(&path)?))
        }
        other => Err(anyhow::anyhow!("Unknown store provider: {}", other)),
    }
}
