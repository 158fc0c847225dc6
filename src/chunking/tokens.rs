//! Shared token counting.
//!
//! Every chunker and context-limit check in the crate measures text with
//! this one counter; chunk budgets are meaningless if different call sites
//! count tokens differently.

use crate::error::{PodgistError, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Token counter backed by the cl100k_base encoding used by the OpenAI
/// embedding and chat models this crate targets.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    /// Create a counter for the cl100k_base encoding.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| PodgistError::Config(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_subword_not_word() {
        let counter = TokenCounter::new().unwrap();
        assert_eq!(counter.count(""), 0);
        assert!(counter.count("hello world") >= 2);
        // A long rare word splits into multiple subword tokens.
        assert!(counter.count("pneumonoultramicroscopic") > 1);
    }

    #[test]
    fn test_longer_text_counts_more() {
        let counter = TokenCounter::new().unwrap();
        let short = counter.count("one sentence.");
        let long = counter.count("one sentence. and then quite a few more words after it.");
        assert!(long > short);
    }
}
