//! Phrase list removed from prompts before they are sent upstream

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ordered, immutable list of trimmed, non-empty phrases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopwordList {
    phrases: Vec<String>,
}

/// Outcome of reading the phrase file at startup
#[derive(Debug, Clone)]
pub enum StopwordLoad {
    Loaded(StopwordList),
    Unavailable { path: PathBuf, reason: String },
}

impl StopwordList {
    /// An empty list; normalization then removes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse newline-delimited phrases, dropping blank lines
    pub fn from_lines(data: &str) -> Self {
        let phrases = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { phrases }
    }

    /// Read the phrase file. Failure is reported, never fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> StopwordLoad {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => StopwordLoad::Loaded(Self::from_lines(&data)),
            Err(e) => StopwordLoad::Unavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl StopwordLoad {
    /// Log the outcome and yield the list (empty when unavailable)
    pub fn into_list(self) -> StopwordList {
        match self {
            StopwordLoad::Loaded(list) => {
                info!("Loaded {} stopword phrases", list.len());
                list
            }
            StopwordLoad::Unavailable { path, reason } => {
                warn!(
                    "Stopword list unavailable at {}: {}; continuing without phrase removal",
                    path.display(),
                    reason
                );
                StopwordList::empty()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, StopwordLoad::Loaded(_))
    }
}

impl fmt::Display for StopwordLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopwordLoad::Loaded(list) => write!(f, "loaded ({} phrases)", list.len()),
            StopwordLoad::Unavailable { path, .. } => {
                write!(f, "unavailable ({})", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_trims_and_skips_blanks() {
        let list = StopwordList::from_lines("  please \n\nthank you\r\n   \nkindly");
        assert_eq!(list.phrases(), &["please", "thank you", "kindly"]);
    }

    #[test]
    fn test_missing_file_is_unavailable_and_empty() {
        let outcome = StopwordList::load("/nonexistent/phrases_to_remove.txt");
        assert!(!outcome.is_loaded());
        assert!(outcome.to_string().starts_with("unavailable"));
        assert!(outcome.into_list().is_empty());
    }

    #[test]
    fn test_load_bundled_phrase_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/phrases_to_remove.txt");
        let outcome = StopwordList::load(path);
        assert!(outcome.is_loaded());
        assert!(!outcome.into_list().is_empty());
    }
}
