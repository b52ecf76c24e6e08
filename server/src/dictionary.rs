//! Word list that supplies the secret word for each round

use crate::config::WordOrder;
use crate::error::DictionaryError;
use log::{info, warn};
use rand::Rng;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Vec<String>,
    order: WordOrder,
    cursor: usize,
}

impl Dictionary {
    /// Loads one word per line from `path`
    ///
    /// Blank lines are skipped silently. Lines that are not made entirely of
    /// ASCII lowercase letters are skipped with a warning, since a guess can
    /// only ever be a single `a`-`z` letter.
    pub fn load(path: impl AsRef<Path>, order: WordOrder) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DictionaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut words = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            if is_playable(word) {
                words.push(word.to_string());
            } else {
                warn!("{}:{}: skipping unplayable word {:?}", path.display(), number + 1, word);
            }
        }

        if words.is_empty() {
            return Err(DictionaryError::Empty {
                origin: path.display().to_string(),
            });
        }

        info!("Loaded {} words from {}", words.len(), path.display());
        Ok(Self::with_words(words, order))
    }

    /// Builds a dictionary from in-memory words with the same filtering as [`Dictionary::load`]
    pub fn from_words<I, S>(words: I, order: WordOrder) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(Into::into)
            .filter(|word| is_playable(word))
            .collect();

        if words.is_empty() {
            return Err(DictionaryError::Empty {
                origin: "word list".to_string(),
            });
        }
        Ok(Self::with_words(words, order))
    }

    /// Size of the dictionary file in bytes
    pub fn file_length(path: impl AsRef<Path>) -> Result<u64, DictionaryError> {
        let path = path.as_ref();
        fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|source| DictionaryError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    fn with_words(words: Vec<String>, order: WordOrder) -> Self {
        Self {
            words,
            order,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Picks the secret word for the next round
    pub fn next_word(&mut self) -> String {
        let index = match self.order {
            WordOrder::Random => rand::thread_rng().gen_range(0..self.words.len()),
            WordOrder::Sequential => {
                let index = self.cursor;
                self.cursor = (self.cursor + 1) % self.words.len();
                index
            }
        };
        self.words[index].clone()
    }
}

fn is_playable(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase())
}
