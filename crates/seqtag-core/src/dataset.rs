//! # Dataset container
//!
//! Holds tokenized sentences as per-token field maps together with the
//! schema (tag inventory, field names) and the sentence-length cutoff.
//! Features read their raw input values out of this container; the tagger
//! maps predicted indices back through its tag inventory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One token: a map from feature/field name to its raw string value.
pub type TokenFields = HashMap<String, String>;

/// One sentence: an ordered sequence of tokens.
pub type Sentence = Vec<TokenFields>;

/// Schema metadata loaded from `meta.json` in the model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Inventory of sequence tags, in index order (e.g. `["O", "B-PER", "I-PER"]`).
    pub tags: Vec<String>,

    /// Optional secondary label inventory for models with a second output head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// A dataset of tokenized sentences with a fixed sentence-length cutoff.
///
/// The cutoff is owned by the dataset, not by any feature: every consumer
/// that iterates sentences is expected to stop at [`Dataset::sentence_length`]
/// tokens and silently drop the rest.
#[derive(Debug, Clone)]
pub struct Dataset {
    meta: DatasetMeta,
    fieldnames: Vec<String>,
    padding: usize,
    data: Vec<Sentence>,
}

impl Dataset {
    /// Create an empty dataset from a `meta.json` schema file.
    ///
    /// # Arguments
    /// * `meta_path` - Path to the schema file
    /// * `fieldnames` - Field names each token record is expected to carry
    /// * `padding` - Sentence-length cutoff (maximum tokens per sentence)
    pub fn empty(
        meta_path: impl AsRef<Path>,
        fieldnames: Vec<String>,
        padding: usize,
    ) -> Result<Self> {
        let meta_str = fs::read_to_string(meta_path.as_ref())?;
        let meta: DatasetMeta = serde_json::from_str(&meta_str)?;

        Ok(Self {
            meta,
            fieldnames,
            padding,
            data: Vec::new(),
        })
    }

    /// Build a dataset directly from an in-memory schema.
    pub fn from_meta(meta: DatasetMeta, fieldnames: Vec<String>, padding: usize) -> Self {
        Self {
            meta,
            fieldnames,
            padding,
            data: Vec::new(),
        }
    }

    /// Clone the schema and configuration without mutating the template.
    ///
    /// The serving layer keeps one template dataset per process and copies
    /// it for every request before injecting records.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Replace the dataset's records.
    pub fn set_data(&mut self, data: Vec<Sentence>) {
        self.data = data;
    }

    /// The sentence-length cutoff.
    pub fn sentence_length(&self) -> usize {
        self.padding
    }

    /// The schema metadata.
    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    /// Field names each token record carries.
    pub fn fieldnames(&self) -> &[String] {
        &self.fieldnames
    }

    /// The sentences currently held by this dataset.
    pub fn data(&self) -> &[Sentence] {
        &self.data
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the dataset holds no sentences.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over sentences.
    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.data.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// Build a sentence from plain token strings under a single field name.
pub fn sentence_from_words(field: &str, words: &[&str]) -> Sentence {
    words
        .iter()
        .map(|w| {
            let mut token = TokenFields::new();
            token.insert(field.to_string(), (*w).to_string());
            token
        })
        .collect()
}
