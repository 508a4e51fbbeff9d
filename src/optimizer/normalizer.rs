//! Rule-based prompt shortening: contractions, then phrase removal

use super::contractions::{whole_word_pattern, ContractionTable};
use super::stopwords::StopwordList;
use crate::error::{Result, SustainError};
use regex::Regex;
use std::borrow::Cow;
use tracing::debug;

/// Applies the contraction table and the stopword list to prompt text
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    contractions: ContractionTable,
    stopwords: Option<Regex>,
}

impl TextNormalizer {
    /// Compile the matchers for the given phrase list
    pub fn new(stopwords: &StopwordList) -> Result<Self> {
        let contractions = ContractionTable::compile()
            .map_err(|e| SustainError::Internal(format!("contraction table: {}", e)))?;

        let stopwords = if stopwords.is_empty() {
            None
        } else {
            let re = whole_word_pattern(stopwords.phrases())
                .map_err(|e| SustainError::Config(format!("stopword list: {}", e)))?;
            Some(re)
        };

        Ok(Self { contractions, stopwords })
    }

    /// Shorten `text`. Passes repeat until nothing changes, so the result is stable
    /// under a second call.
    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.apply_rules(text);
        loop {
            // Every rule that fires makes the text strictly shorter.
            let next = self.apply_rules(&current);
            if next == current {
                return current;
            }
            debug!("Normalization pass changed text, repeating");
            current = next;
        }
    }

    fn apply_rules(&self, text: &str) -> String {
        let contracted = self.contractions.apply(text);
        match &self.stopwords {
            Some(re) => match re.replace_all(&contracted, "") {
                Cow::Owned(stripped) => collapse_whitespace(&stripped),
                Cow::Borrowed(_) => contracted,
            },
            None => contracted,
        }
    }

    pub fn has_stopwords(&self) -> bool {
        self.stopwords.is_some()
    }
}

/// Whitespace-delimited word count; empty text counts as zero
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
