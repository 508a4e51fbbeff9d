//! Fixed phrase-to-contraction table

use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// Phrase and its contracted form, applied in this order
pub const CONTRACTIONS: &[(&str, &str)] = &[
    ("I am", "I'm"),
    ("can not", "can't"),
    ("and", "&"),
    ("will not", "won't"),
    ("do not", "don't"),
    ("does not", "doesn't"),
    ("is not", "isn't"),
    ("are not", "aren't"),
    ("was not", "wasn't"),
    ("were not", "weren't"),
    ("have not", "haven't"),
    ("has not", "hasn't"),
    ("had not", "hadn't"),
    ("would not", "wouldn't"),
    ("should not", "shouldn't"),
    ("could not", "couldn't"),
    ("it is", "it's"),
    ("that is", "that's"),
    ("what is", "what's"),
    ("where is", "where's"),
    ("who is", "who's"),
    ("how is", "how's"),
    ("let us", "let's"),
    ("you are", "you're"),
    ("we are", "we're"),
    ("they are", "they're"),
    ("cannot", "can't"),
];

/// Compiled matchers for [`CONTRACTIONS`]
#[derive(Debug, Clone)]
pub struct ContractionTable {
    rules: Vec<(Regex, &'static str)>,
}

impl ContractionTable {
    /// Compile every phrase into a case-insensitive whole-word matcher
    pub fn compile() -> Result<Self, regex::Error> {
        let rules = CONTRACTIONS
            .iter()
            .map(|(phrase, contracted)| {
                whole_word_pattern(&[phrase]).map(|re| (re, *contracted))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Replace every listed phrase with its contraction
    pub fn apply(&self, text: &str) -> String {
        let mut contracted = text.to_string();
        for (re, replacement) in &self.rules {
            if let Cow::Owned(replaced) = re.replace_all(&contracted, NoExpand(*replacement)) {
                contracted = replaced;
            }
        }
        contracted
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Build `(?i)\b(p1|p2|...)\b` with every phrase escaped
pub(crate) fn whole_word_pattern<S: AsRef<str>>(phrases: &[S]) -> Result<Regex, regex::Error> {
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
}
