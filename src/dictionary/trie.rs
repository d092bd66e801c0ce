//! Trie over the accepted word corpus
//!
//! Membership is O(word length). Constrained sampling walks the subtree under the
//! required first letter, pruning edges for banned letters, and reservoir-samples the
//! words that pass the remaining filters.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default, Clone)]
struct Node {
    children: BTreeMap<char, usize>,
    terminal: bool,
}

/// Status of a word against the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordStatus {
    Accepted,
    Rejected { reason: Option<String> },
    Unknown,
}

/// One immutable version of the dictionary
#[derive(Debug, Clone)]
pub struct WordDictionary {
    version: u64,
    nodes: Vec<Node>,
    len: usize,
    rejected: HashMap<String, Option<String>>,
}

/// A word consists of letters only
pub fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}

/// Constraints for [`WordDictionary::sample`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WordQuery<'a> {
    pub min_len: usize,
    pub starts_with: Option<char>,
    pub contains: Option<char>,
    pub banned: &'a [char],
    pub exclude: Option<&'a HashSet<String>>,
}

impl<'a> WordQuery<'a> {
    pub fn new(min_len: usize) -> Self {
        Self {
            min_len,
            ..Default::default()
        }
    }

    pub fn starts_with(mut self, letter: char) -> Self {
        self.starts_with = Some(letter);
        self
    }

    pub fn contains(mut self, letter: char) -> Self {
        self.contains = Some(letter);
        self
    }

    pub fn banned(mut self, letters: &'a [char]) -> Self {
        self.banned = letters;
        self
    }

    pub fn exclude(mut self, words: &'a HashSet<String>) -> Self {
        self.exclude = Some(words);
        self
    }

    fn accepts(&self, word: &str, len: usize) -> bool {
        len >= self.min_len
            && self.contains.is_none_or(|c| word.contains(c))
            && self.exclude.is_none_or(|ex| !ex.contains(word))
    }
}

impl WordDictionary {
    /// Build a dictionary from raw words. Words are trimmed and lowercased; anything
    /// that is not purely alphabetic is skipped.
    pub fn build<I, S>(version: u64, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self {
            version,
            nodes: vec![Node::default()],
            len: 0,
            rejected: HashMap::new(),
        };
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if is_word(&word) {
                dict.insert(&word);
            }
        }
        dict
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_rejected(mut self, rejected: HashMap<String, Option<String>>) -> Self {
        self.rejected = rejected;
        self
    }

    fn insert(&mut self, word: &str) {
        let mut idx = 0;
        for c in word.chars() {
            idx = match self.nodes[idx].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[idx].children.insert(c, next);
                    next
                }
            };
        }
        if !self.nodes[idx].terminal {
            self.nodes[idx].terminal = true;
            self.len += 1;
        }
    }

    fn find(&self, prefix: &str) -> Option<usize> {
        prefix
            .chars()
            .try_fold(0, |idx, c| self.nodes[idx].children.get(&c).copied())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Case-insensitive membership test
    pub fn contains_word(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.find(&word).is_some_and(|idx| self.nodes[idx].terminal)
    }

    pub fn lookup(&self, word: &str) -> WordStatus {
        let word = word.to_lowercase();
        if self.contains_word(&word) {
            WordStatus::Accepted
        } else if let Some(reason) = self.rejected.get(&word) {
            WordStatus::Rejected {
                reason: reason.clone(),
            }
        } else {
            WordStatus::Unknown
        }
    }

    /// All words satisfying the query, in lexical order
    pub fn eligible<'q>(&'q self, query: &'q WordQuery<'q>) -> Eligible<'q> {
        let mut stack = Vec::new();
        match query.starts_with {
            Some(first) if query.banned.contains(&first) => {}
            Some(first) => {
                if let Some(&idx) = self.nodes[0].children.get(&first) {
                    stack.push((idx, first.to_string(), 1));
                }
            }
            None => stack.push((0, String::new(), 0)),
        }
        Eligible {
            dict: self,
            query,
            stack,
        }
    }

    /// One eligible word chosen at random, or `None` when nothing satisfies the query.
    /// Every eligible word can be returned.
    ///
    /// Without a required first letter only one first-letter subtree is walked: the
    /// letters are tried in random order until one yields a word.
    pub fn sample<R: Rng + ?Sized>(&self, query: &WordQuery<'_>, rng: &mut R) -> Option<String> {
        if query.starts_with.is_some() {
            return self.eligible(query).choose(rng);
        }

        let mut firsts: Vec<char> = self.nodes[0]
            .children
            .keys()
            .copied()
            .filter(|c| !query.banned.contains(c))
            .collect();
        firsts.shuffle(rng);
        firsts.into_iter().find_map(|first| {
            let narrowed = query.starts_with(first);
            self.eligible(&narrowed).choose(rng)
        })
    }
}

/// Depth-first walk over the words matching a [`WordQuery`]
pub struct Eligible<'q> {
    dict: &'q WordDictionary,
    query: &'q WordQuery<'q>,
    stack: Vec<(usize, String, usize)>,
}

impl Iterator for Eligible<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let dict = self.dict;
        while let Some((idx, prefix, depth)) = self.stack.pop() {
            let node = &dict.nodes[idx];
            for (&c, &child) in node.children.iter().rev() {
                if self.query.banned.contains(&c) {
                    continue;
                }
                let mut next = prefix.clone();
                next.push(c);
                self.stack.push((child, next, depth + 1));
            }
            if node.terminal && depth > 0 && self.query.accepts(&prefix, depth) {
                return Some(prefix);
            }
        }
        None
    }
}
