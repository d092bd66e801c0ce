//! Versioned word dictionary
//!
//! The active [`WordDictionary`] is held behind an `Arc` that readers clone, so a
//! corpus update swaps in a whole new version while in-flight queries finish on the
//! old one.

mod trie;

pub use trie::{is_word, Eligible, WordDictionary, WordQuery, WordStatus};

use crate::error::DictionaryError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Accepted words plus rejected words with an optional reason
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub accepted: Vec<String>,
    pub rejected: HashMap<String, Option<String>>,
}

impl Corpus {
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: accepted.into_iter().map(Into::into).collect(),
            rejected: HashMap::new(),
        }
    }

    /// Load a word list (one word per line) and an optional rejected list
    /// (`word<TAB>reason` or just `word` per line)
    pub async fn load(
        words_path: &Path,
        rejected_path: Option<&Path>,
    ) -> Result<Self, DictionaryError> {
        let text = tokio::fs::read_to_string(words_path).await?;
        let accepted: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let rejected = match rejected_path {
            Some(path) => parse_rejected(&tokio::fs::read_to_string(path).await?),
            None => HashMap::new(),
        };

        tracing::info!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            path = %words_path.display(),
            "Loaded word corpus"
        );

        Ok(Self { accepted, rejected })
    }
}

fn parse_rejected(text: &str) -> HashMap<String, Option<String>> {
    text.lines()
        .filter_map(|line| {
            let (word, reason) = match line.split_once('\t') {
                Some((w, r)) => (w, Some(r.trim())),
                None => (line, None),
            };
            let word = word.trim().to_lowercase();
            (!word.is_empty()).then(|| {
                let reason = reason.filter(|r| !r.is_empty()).map(str::to_string);
                (word, reason)
            })
        })
        .collect()
}

/// Shared handle to the active dictionary version
#[derive(Debug, Clone)]
pub struct DictionaryHandle {
    current: Arc<RwLock<Arc<WordDictionary>>>,
}

impl DictionaryHandle {
    pub fn new(corpus: Corpus) -> Result<Self, DictionaryError> {
        let dict = build(1, corpus)?;
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(dict))),
        })
    }

    /// Wrap an already built dictionary
    pub fn from_dictionary(dict: WordDictionary) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(dict))),
        }
    }

    /// The active version. Holders keep it alive across updates.
    pub async fn snapshot(&self) -> Arc<WordDictionary> {
        self.current.read().await.clone()
    }

    /// Replace the active version wholesale. Returns the new version number.
    pub async fn update(&self, corpus: Corpus) -> Result<u64, DictionaryError> {
        // Build outside the lock so readers are never blocked on it
        let dict = build(0, corpus)?;
        let mut current = self.current.write().await;
        let version = current.version() + 1;
        *current = Arc::new(dict.with_version(version));
        tracing::info!(version, words = current.len(), "Dictionary updated");
        Ok(version)
    }
}

fn build(version: u64, corpus: Corpus) -> Result<WordDictionary, DictionaryError> {
    let dict = WordDictionary::build(version, &corpus.accepted).with_rejected(corpus.rejected);
    if dict.is_empty() {
        return Err(DictionaryError::EmptyCorpus);
    }
    Ok(dict)
}
