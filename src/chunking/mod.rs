//! Transcript chunking strategies.
//!
//! Splits long transcripts into model-context-sized chunks with configurable
//! overlap. All strategies measure text with the same [`TokenCounter`] used
//! elsewhere in the crate.

mod fixed;
mod recursive;
mod speaker;
mod tokens;

pub use fixed::FixedWindowChunker;
pub use recursive::RecursiveChunker;
pub use speaker::{parse_speaker_turns, SpeakerChunker, SpeakerTurn};
pub use tokens::TokenCounter;

use crate::config::ChunkingSettings;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A bounded span of transcript text, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Speaker name, when the source transcript carried speaker turns.
    pub speaker: Option<String>,
    /// Start of the covered time range in seconds, when known.
    pub start_seconds: Option<f64>,
    /// End of the covered time range in seconds, when known.
    pub end_seconds: Option<f64>,
}

impl TranscriptChunk {
    /// Create a plain text chunk without speaker or timing metadata.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            speaker: None,
            start_seconds: None,
            end_seconds: None,
        }
    }
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Overlapping fixed token window over sentences.
    Fixed,
    /// Boundary-aware recursive separator split.
    Recursive,
    /// Speaker-turn aligned chunking for diarized transcripts.
    Speaker,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "recursive" | "semantic" => Ok(ChunkingStrategy::Recursive),
            "speaker" => Ok(ChunkingStrategy::Speaker),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

/// Trait for transcript chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split transcript text into chunks.
    fn chunk(&self, text: &str) -> Result<Vec<TranscriptChunk>>;
}

/// Create a chunker for the configured strategy.
pub fn create_chunker(
    strategy: ChunkingStrategy,
    settings: &ChunkingSettings,
    counter: TokenCounter,
) -> Box<dyn Chunker> {
    match strategy {
        ChunkingStrategy::Fixed => Box::new(FixedWindowChunker::new(
            settings.chunk_size,
            settings.overlap_size,
            counter,
        )),
        ChunkingStrategy::Recursive => Box::new(RecursiveChunker::new(
            settings.chunk_size,
            settings.overlap_size,
            counter,
        )),
        ChunkingStrategy::Speaker => {
            Box::new(SpeakerChunker::new(settings.speaker_chunk_size, counter))
        }
    }
}

/// Split text into sentences on terminal punctuation followed by whitespace.
///
/// Terminal punctuation stays attached to its sentence. Text without any
/// sentence boundary comes back as a single element.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // Consume closing quotes before checking for the boundary.
            while matches!(chars.peek(), Some('"') | Some('\'') | Some(')')) {
                current.push(chars.next().unwrap());
            }
            if chars.peek().is_none_or(|next| next.is_whitespace()) {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
                // Skip the inter-sentence whitespace.
                while chars.peek().is_some_and(|next| next.is_whitespace()) {
                    chars.next();
                }
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Take the trailing words of `text` amounting to roughly `budget` tokens.
///
/// Overlap is cut at whitespace word boundaries, so the actual token count
/// is approximate; exact token alignment is not required for overlap.
pub(crate) fn trailing_words(text: &str, budget: usize, counter: &TokenCounter) -> String {
    if budget == 0 {
        return String::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut taken = Vec::new();
    let mut spent = 0;

    for word in words.iter().rev() {
        let cost = counter.count(word).max(1);
        if spent + cost > budget {
            break;
        }
        spent += cost;
        taken.push(*word);
    }

    taken.reverse();
    taken.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("First one. Second one! Third?");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn test_split_sentences_no_boundary() {
        let sentences = split_sentences("no terminal punctuation here");
        assert_eq!(sentences, vec!["no terminal punctuation here"]);
    }

    #[test]
    fn test_split_sentences_abbrev_period_mid_word() {
        // A period not followed by whitespace is not a boundary.
        let sentences = split_sentences("Version 1.5 shipped today. It works.");
        assert_eq!(sentences, vec!["Version 1.5 shipped today.", "It works."]);
    }

    #[test]
    fn test_trailing_words_respects_budget() {
        let counter = TokenCounter::new().unwrap();
        let text = "alpha beta gamma delta epsilon zeta";
        let tail = trailing_words(text, 3, &counter);
        assert!(text.ends_with(&tail));
        assert!(counter.count(&tail) <= 3 + 2); // word-boundary slack
        assert!(!tail.is_empty());
    }

    #[test]
    fn test_trailing_words_zero_budget() {
        let counter = TokenCounter::new().unwrap();
        assert_eq!(trailing_words("some words here", 0, &counter), "");
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("fixed".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Fixed);
        assert_eq!("recursive".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Recursive);
        assert_eq!("speaker".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Speaker);
        assert!("nope".parse::<ChunkingStrategy>().is_err());
    }
}
