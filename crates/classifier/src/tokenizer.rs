//! Word-level tokenizer with a fixed vocabulary and hashed OOV buckets.

use std::collections::HashMap;

use crate::error::ClassifierError;

/// Padding id; never produced for a real word.
pub const PAD_ID: u32 = 0;
/// Out-of-vocabulary id, used when no hash buckets are configured.
pub const OOV_ID: u32 = 1;

const FIRST_WORD_ID: u32 = 2;

/// Maps words to integer ids.
///
/// Ids `0` and `1` are reserved (PAD, OOV). Vocabulary ids start at `2`.
/// Unknown words land in `oov_buckets` hashed slots placed right after the
/// highest vocabulary id, or on [`OOV_ID`] when there are no buckets.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocabulary: HashMap<String, u32>,
    oov_buckets: u32,
    oov_offset: u32,
}

impl Tokenizer {
    pub fn new(vocabulary: HashMap<String, u32>, oov_buckets: u32) -> Result<Self, ClassifierError> {
        if let Some((word, id)) = vocabulary.iter().find(|(_, id)| **id < FIRST_WORD_ID) {
            return Err(ClassifierError::InvalidArtifact(format!(
                "vocabulary id {id} for '{word}' collides with a reserved id"
            )));
        }

        let oov_offset = match vocabulary.values().max() {
            Some(max) => max.checked_add(1),
            None => Some(FIRST_WORD_ID),
        };
        // Every bucket id must fit in a u32 so hashed ids never wrap onto PAD.
        let Some(oov_offset) = oov_offset.filter(|offset| offset.checked_add(oov_buckets).is_some())
        else {
            return Err(ClassifierError::InvalidArtifact(format!(
                "vocabulary and {oov_buckets} oov buckets exceed the u32 id range"
            )));
        };

        Ok(Self {
            vocabulary,
            oov_buckets,
            oov_offset,
        })
    }

    /// Number of distinct ids this tokenizer can emit (PAD included).
    pub fn id_space(&self) -> usize {
        if self.oov_buckets == 0 {
            self.oov_offset as usize
        } else {
            (self.oov_offset + self.oov_buckets) as usize
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Lowercased words with surrounding punctuation removed.
    pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
    }

    pub fn token_id(&self, word: &str) -> u32 {
        if let Some(id) = self.vocabulary.get(word) {
            return *id;
        }
        if self.oov_buckets == 0 {
            return OOV_ID;
        }
        self.oov_offset + char_code_hash(word) % self.oov_buckets
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        Self::words(text).map(|w| self.token_id(&w)).collect()
    }
}

/// Polynomial hash over the word's character codes (base 31, wrapping).
pub fn char_code_hash(word: &str) -> u32 {
    word.chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}
