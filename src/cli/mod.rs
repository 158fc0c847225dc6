//! CLI module for Podgist.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Podgist - Podcast transcription and retrieval
///
/// Ingests podcast episodes, transcribes and indexes them, and answers
/// questions grounded in the archive.
#[derive(Parser, Debug)]
#[command(name = "podgist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Download, transcribe, and index one episode
    Ingest {
        /// Episode audio URL or local audio file
        url: String,

        /// Feed-level episode guid
        #[arg(short, long)]
        guid: String,

        /// Episode title
        #[arg(short, long)]
        title: String,

        /// Episode number in the feed
        #[arg(short, long)]
        number: Option<i64>,

        /// Force re-processing even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Rechunk an indexed episode from its stored transcript
    Rechunk {
        /// Episode guid
        guid: String,
    },

    /// Regenerate the summary for a transcribed episode
    Summarize {
        /// Episode guid
        guid: String,
    },

    /// Search the indexed archive
    Search {
        /// Search query
        query: String,

        /// Search mode (chunk, episode, keyword)
        #[arg(short, long, default_value = "chunk")]
        mode: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score a match must exceed
        #[arg(short, long, default_value = "0.1")]
        threshold: f32,
    },

    /// Ask a question and get an answer grounded in the archive
    Ask {
        /// The question to ask
        question: String,
    },

    /// List ingested episodes
    List,

    /// Delete an episode and its chunks
    Delete {
        /// Episode guid
        guid: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
