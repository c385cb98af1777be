//! # Sub-token encoder
//!
//! Turns raw word strings into fixed-length sub-token id sequences and
//! batches whole sentences into a dense integer tensor. The encoder is
//! vocabulary-backed: every word listed in `vocabulary.txt` is pre-encoded
//! at construction time into an in-memory cache, which is what makes this
//! object expensive to build and unsuitable for serialization.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use candle_core::{Device, Tensor};
use tracing::debug;

use crate::error::{Result, SeqtagError};

/// Id used to pad unused sub-token slots. Reserved so downstream masking
/// can distinguish padding from real content.
pub const PAD_ID: i64 = 0;

/// Sentinel id marking the beginning of a word.
pub const BOW_ID: i64 = 257;

/// Sentinel id marking the end of a word.
pub const EOW_ID: i64 = 258;

/// Number of distinct sub-token ids the encoder can emit (padding, shifted
/// byte values, and the two word sentinels).
pub const SUB_TOKEN_VOCAB_SIZE: usize = 259;

/// Vocabulary-backed encoder producing fixed-length sub-token id sequences.
#[derive(Debug, Clone)]
pub struct Encoder {
    max_word_length: usize,
    cache: HashMap<String, Vec<i64>>,
}

impl Encoder {
    /// Build an encoder from a vocabulary file, one word per line.
    ///
    /// Every vocabulary word is encoded eagerly so that batching known
    /// words is a map lookup. Two encoders built from the same vocabulary
    /// file and word length behave identically.
    pub fn new(vocab_path: impl AsRef<Path>, max_word_length: usize) -> Result<Self> {
        let vocab_path = vocab_path.as_ref();
        if !vocab_path.exists() {
            return Err(SeqtagError::MissingResource {
                path: vocab_path.to_path_buf(),
            });
        }
        if max_word_length < 3 {
            return Err(SeqtagError::Config(format!(
                "max word length must be at least 3, got {max_word_length}"
            )));
        }

        let contents = fs::read_to_string(vocab_path)?;
        let mut cache = HashMap::new();
        for line in contents.lines() {
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            cache.insert(word.to_string(), encode_word(word, max_word_length));
        }
        debug!(words = cache.len(), "encoder vocabulary loaded");

        Ok(Self {
            max_word_length,
            cache,
        })
    }

    /// The fixed per-word sub-token length.
    pub fn max_word_length(&self) -> usize {
        self.max_word_length
    }

    /// Number of pre-encoded vocabulary words.
    pub fn vocab_size(&self) -> usize {
        self.cache.len()
    }

    /// Encode a single word into exactly `max_word_length` sub-token ids.
    pub fn encode(&self, word: &str) -> Vec<i64> {
        match self.cache.get(word) {
            Some(ids) => ids.clone(),
            None => encode_word(word, self.max_word_length),
        }
    }

    /// Batch sentences into a dense integer tensor of shape
    /// `(num_sentences, max_sentence_length_in_batch, max_word_length)`.
    ///
    /// Sentences shorter than the longest one are padded with all-padding
    /// word rows. The batch is padded to the longest sentence actually
    /// present, never to any external cutoff.
    pub fn batch_sentences(&self, sentences: &[Vec<String>]) -> Result<Tensor> {
        if sentences.is_empty() {
            return Err(SeqtagError::EmptyInput);
        }

        let n = sentences.len();
        let max_len = sentences.iter().map(Vec::len).max().unwrap_or(0);
        let sub_len = self.max_word_length;

        let mut flat = vec![PAD_ID; n * max_len * sub_len];
        for (s, sentence) in sentences.iter().enumerate() {
            for (w, word) in sentence.iter().enumerate() {
                let ids = self.encode(word);
                let start = (s * max_len + w) * sub_len;
                flat[start..start + sub_len].copy_from_slice(&ids);
            }
        }

        Ok(Tensor::from_vec(flat, (n, max_len, sub_len), &Device::Cpu)?)
    }
}

/// Encode one word: `[BOW, utf-8 bytes shifted by 1, EOW]`, truncated to
/// `max_word_length` and padded with [`PAD_ID`].
fn encode_word(word: &str, max_word_length: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(max_word_length);
    ids.push(BOW_ID);
    for &b in word.as_bytes().iter().take(max_word_length - 2) {
        ids.push(i64::from(b) + 1);
    }
    ids.push(EOW_ID);
    ids.resize(max_word_length, PAD_ID);
    ids
}
