//! Recursive separator-based chunking.
//!
//! Splits on a ranked list of separators (paragraph breaks first, then line
//! breaks, then sentence boundaries), recursing with finer separators for any
//! piece that still exceeds the token budget, then greedily merges pieces
//! back up to the budget with word-level overlap between chunks.

use super::{trailing_words, Chunker, TokenCounter, TranscriptChunk};
use crate::error::Result;
use tracing::debug;

/// Separators ordered from coarsest to finest.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", "? ", "! "];

pub struct RecursiveChunker {
    chunk_size: usize,
    overlap_size: usize,
    counter: TokenCounter,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, overlap_size: usize, counter: TokenCounter) -> Self {
        Self {
            chunk_size,
            overlap_size,
            counter,
        }
    }

    /// Split `text` on `separator`, keeping the separator attached to the
    /// piece it terminates so merging restores the original text.
    fn split_keeping(text: &str, separator: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while let Some(pos) = rest.find(separator) {
            let end = pos + separator.len();
            pieces.push(rest[..end].to_string());
            rest = &rest[end..];
        }
        if !rest.is_empty() {
            pieces.push(rest.to_string());
        }
        pieces
    }

    /// Break `text` into pieces that each fit the token budget, using the
    /// coarsest separator that produces a split and recursing with finer
    /// ones for oversized pieces.
    fn decompose(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if self.counter.count(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        match separators.split_first() {
            Some((separator, finer)) => {
                let pieces = Self::split_keeping(text, separator);
                if pieces.len() <= 1 {
                    return self.decompose(text, finer);
                }
                pieces
                    .iter()
                    .flat_map(|piece| {
                        if self.counter.count(piece) > self.chunk_size {
                            self.decompose(piece, finer)
                        } else {
                            vec![piece.clone()]
                        }
                    })
                    .collect()
            }
            // No separator left: fall back to splitting on words.
            None => self.split_words(text),
        }
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for word in text.split_whitespace() {
            let word_tokens = self.counter.count(word);
            if current_tokens + word_tokens > self.chunk_size && !current.is_empty() {
                pieces.push(current.clone());
                current.clear();
                current_tokens = 0;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_tokens += word_tokens;
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    /// Strip stray punctuation that a separator split can leave at the head
    /// of a chunk, such as a sentence terminator orphaned from its sentence.
    fn clean_leading_punctuation(chunk: &str) -> &str {
        chunk
            .trim_start_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
            .trim_start()
    }

    /// Greedily merge budget-sized pieces into chunks, carrying a word-level
    /// tail of each closed chunk into the next.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for piece in pieces {
            let piece_tokens = self.counter.count(&piece);

            if current_tokens + piece_tokens > self.chunk_size && !current.trim().is_empty() {
                let closed = current.trim().to_string();
                let overlap = trailing_words(&closed, self.overlap_size, &self.counter);
                chunks.push(closed);

                current.clear();
                current_tokens = 0;
                if !overlap.is_empty() {
                    current_tokens = self.counter.count(&overlap);
                    current.push_str(&overlap);
                    current.push(' ');
                }
            }

            current.push_str(&piece);
            current_tokens += piece_tokens;
        }

        let trimmed = current.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Result<Vec<TranscriptChunk>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        if self.counter.count(text) <= self.chunk_size {
            return Ok(vec![TranscriptChunk::text(text)]);
        }

        let pieces = self.decompose(text, &SEPARATORS);
        let chunks = self.merge(pieces);
        debug!("Recursive chunking produced {} chunks", chunks.len());
        Ok(chunks
            .iter()
            .map(|c| Self::clean_leading_punctuation(c))
            .filter(|c| !c.is_empty())
            .map(TranscriptChunk::text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::new().unwrap()
    }

    fn paragraph(topic: &str, sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("{} point {} expands on the discussion in detail.", topic, i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_input_single_chunk() {
        let chunker = RecursiveChunker::new(200, 20, counter());
        let chunks = chunker.chunk("A brief transcript.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "A brief transcript.");
    }

    #[test]
    fn test_splits_on_paragraph_boundaries() {
        let counter = counter();
        let chunker = RecursiveChunker::new(80, 10, counter.clone());

        let text = format!("{}\n\n{}", paragraph("First", 6), paragraph("Second", 6));
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.contains("First point 0"));
        // The paragraph break is a split point, not part of any chunk body.
        for chunk in &chunks {
            assert!(!chunk.content.contains("\n\n"));
        }
    }

    #[test]
    fn test_recurses_to_sentence_splits() {
        let counter = counter();
        let chunker = RecursiveChunker::new(60, 10, counter.clone());

        // One long paragraph with no line breaks forces sentence-level splits.
        let text = paragraph("Topic", 15);
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(counter.count(&chunk.content) <= 62);
        }
    }

    #[test]
    fn test_chunks_carry_overlap() {
        let counter = counter();
        let chunker = RecursiveChunker::new(60, 10, counter.clone());

        let text = paragraph("Overlap", 15);
        let chunks = chunker.chunk(&text).unwrap();
        assert!(chunks.len() > 1);

        for window in chunks.windows(2) {
            let overlap = trailing_words(&window[0].content, 10, &counter);
            assert!(!overlap.is_empty());
            assert!(window[1].content.starts_with(&overlap));
        }
    }

    #[test]
    fn test_word_fallback_for_unbroken_text() {
        let counter = counter();
        let chunker = RecursiveChunker::new(40, 5, counter.clone());

        // No separator of any kind except spaces.
        let text = (0..120).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(counter.count(&chunk.content) <= 48);
        }
    }

    #[test]
    fn test_leading_punctuation_stripped() {
        let chunker = RecursiveChunker::new(14, 0, counter());

        // The paragraph break splits right before an orphaned terminator, so
        // without cleanup one chunk would begin with ". And".
        let text = format!(
            "{}\n\n. And this stray fragment keeps its words.",
            paragraph("Lead", 3)
        );
        let chunks = chunker.chunk(&text).unwrap();
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            let first = chunk.content.chars().next().unwrap();
            assert!(
                first.is_alphanumeric(),
                "chunk starts with stray punctuation: {:?}",
                chunk.content
            );
        }
        assert!(chunks
            .iter()
            .any(|c| c.content.starts_with("And this stray fragment")));
    }

    #[test]
    fn test_empty_input() {
        let chunker = RecursiveChunker::new(100, 10, counter());
        assert!(chunker.chunk("\n \n").unwrap().is_empty());
    }
}
