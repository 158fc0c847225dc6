//! Speaker-turn chunking for diarized transcripts.
//!
//! Parses lines of the form `Name: text` or `Name [mm:ss - mm:ss]: text`
//! into speaker turns, then emits one chunk per run of consecutive turns by
//! the same speaker, splitting a run that exceeds the token budget.

use super::{Chunker, TokenCounter, TranscriptChunk};
use crate::error::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// A single attributed utterance from a diarized transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub text: String,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
}

fn turn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<speaker>[^:\[\]\n]{1,64}?)\s*(?:\[(?P<start>\d{1,2}(?::\d{2}){1,2})\s*-\s*(?P<end>\d{1,2}(?::\d{2}){1,2})\])?\s*:\s*(?P<text>.*)$",
        )
        .unwrap_or_else(|e| panic!("invalid speaker turn pattern: {}", e))
    })
}

/// Parse `mm:ss` or `hh:mm:ss` into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    let numbers: Option<Vec<f64>> = parts.iter().map(|p| p.parse::<f64>().ok()).collect();
    match numbers?.as_slice() {
        [minutes, seconds] => Some(minutes * 60.0 + seconds),
        [hours, minutes, seconds] => Some(hours * 3600.0 + minutes * 60.0 + seconds),
        _ => None,
    }
}

/// Parse a transcript into speaker turns. Lines that do not open a new turn
/// are appended to the previous one.
pub fn parse_speaker_turns(text: &str) -> Vec<SpeakerTurn> {
    let mut turns: Vec<SpeakerTurn> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = turn_pattern().captures(line) {
            let speaker = caps["speaker"].trim().to_string();
            let start = caps.name("start").and_then(|m| parse_timestamp(m.as_str()));
            let end = caps.name("end").and_then(|m| parse_timestamp(m.as_str()));
            turns.push(SpeakerTurn {
                speaker,
                text: caps["text"].trim().to_string(),
                start_seconds: start,
                end_seconds: end,
            });
        } else if let Some(last) = turns.last_mut() {
            if !last.text.is_empty() {
                last.text.push(' ');
            }
            last.text.push_str(line);
        }
        // Leading lines before the first attributed turn are dropped.
    }

    turns.retain(|t| !t.text.is_empty());
    turns
}

pub struct SpeakerChunker {
    chunk_size: usize,
    counter: TokenCounter,
}

impl SpeakerChunker {
    pub fn new(chunk_size: usize, counter: TokenCounter) -> Self {
        Self {
            chunk_size,
            counter,
        }
    }

    fn close(chunks: &mut Vec<TranscriptChunk>, speaker: &str, texts: &mut Vec<String>, start: Option<f64>, end: Option<f64>) {
        if texts.is_empty() {
            return;
        }
        chunks.push(TranscriptChunk {
            content: texts.join(" "),
            speaker: Some(speaker.to_string()),
            start_seconds: start,
            end_seconds: end,
        });
        texts.clear();
    }
}

impl Chunker for SpeakerChunker {
    fn chunk(&self, text: &str) -> Result<Vec<TranscriptChunk>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let turns = parse_speaker_turns(trimmed);
        // Without diarization markers the transcript passes through whole.
        if turns.is_empty() {
            return Ok(vec![TranscriptChunk::text(trimmed)]);
        }

        let mut chunks = Vec::new();
        let mut speaker = turns[0].speaker.clone();
        let mut texts: Vec<String> = Vec::new();
        let mut tokens = 0usize;
        let mut start = None;
        let mut end = None;

        for turn in turns {
            let turn_tokens = self.counter.count(&turn.text);
            let over_budget = tokens + turn_tokens > self.chunk_size && !texts.is_empty();

            if turn.speaker != speaker || over_budget {
                Self::close(&mut chunks, &speaker, &mut texts, start, end);
                speaker = turn.speaker.clone();
                tokens = 0;
                start = None;
                end = None;
            }

            if start.is_none() {
                start = turn.start_seconds;
            }
            if turn.end_seconds.is_some() {
                end = turn.end_seconds;
            }
            tokens += turn_tokens;
            texts.push(turn.text);
        }
        Self::close(&mut chunks, &speaker, &mut texts, start, end);

        debug!("Speaker chunking produced {} chunks", chunks.len());
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::new().unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1:30"), Some(90.0));
        assert_eq!(parse_timestamp("01:02:03"), Some(3723.0));
        assert_eq!(parse_timestamp("nope"), None);
    }

    #[test]
    fn test_parse_turns_with_timestamps() {
        let text = "Alice [0:00 - 0:45]: Welcome to the show.\nBob [0:45 - 1:30]: Thanks for having me.";
        let turns = parse_speaker_turns(text);

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, "Alice");
        assert_eq!(turns[0].start_seconds, Some(0.0));
        assert_eq!(turns[0].end_seconds, Some(45.0));
        assert_eq!(turns[1].speaker, "Bob");
        assert_eq!(turns[1].text, "Thanks for having me.");
    }

    #[test]
    fn test_continuation_lines_append() {
        let text = "Alice: First line.\nIt keeps going.\nBob: Reply.";
        let turns = parse_speaker_turns(text);

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "First line. It keeps going.");
    }

    #[test]
    fn test_chunks_split_on_speaker_change() {
        let chunker = SpeakerChunker::new(7000, counter());
        let text = "Alice: One thought.\nAlice: Another thought.\nBob: A reply.";

        let chunks = chunker.chunk(text).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(chunks[0].content, "One thought. Another thought.");
        assert_eq!(chunks[1].speaker.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_long_run_splits_on_token_budget() {
        let counter = counter();
        let chunker = SpeakerChunker::new(30, counter.clone());

        let text = (0..10)
            .map(|i| format!("Alice: Turn {} goes on about something.", i))
            .collect::<Vec<_>>()
            .join("\n");

        let chunks = chunker.chunk(&text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.speaker.as_deref(), Some("Alice"));
            assert!(counter.count(&chunk.content) <= 32);
        }
    }

    #[test]
    fn test_timestamps_span_merged_turns() {
        let chunker = SpeakerChunker::new(7000, counter());
        let text = "Alice [0:00 - 0:30]: Opening.\nAlice [0:30 - 1:00]: More.\nBob [1:00 - 1:10]: Closing.";

        let chunks = chunker.chunk(text).unwrap();
        assert_eq!(chunks[0].start_seconds, Some(0.0));
        assert_eq!(chunks[0].end_seconds, Some(60.0));
    }

    #[test]
    fn test_undiarized_text_passes_through() {
        let chunker = SpeakerChunker::new(7000, counter());
        let chunks = chunker.chunk("Just prose with no markers").unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].speaker.is_none());
    }
}
