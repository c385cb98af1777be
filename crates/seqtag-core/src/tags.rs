//! # Tag inventory
//!
//! Dynamic tag set for sequence labeling, loaded from the model's
//! `meta.json`. Supports the BIO scheme: an `I-X` tag may only follow
//! `B-X` or `I-X`; every other transition is allowed.

use std::collections::HashMap;

use crate::error::{Result, SeqtagError};

/// An ordered inventory of sequence tags with index lookup.
#[derive(Debug, Clone)]
pub struct TagSet {
    tags: Vec<String>,
    index: HashMap<String, usize>,
}

impl TagSet {
    /// Build a tag set from an ordered list of distinct tag strings.
    pub fn new(tags: Vec<String>) -> Result<Self> {
        if tags.is_empty() {
            return Err(SeqtagError::Config("tag inventory is empty".into()));
        }
        let mut index = HashMap::with_capacity(tags.len());
        for (i, tag) in tags.iter().enumerate() {
            if index.insert(tag.clone(), i).is_some() {
                return Err(SeqtagError::Config(format!("duplicate tag {tag:?}")));
            }
        }
        Ok(Self { tags, index })
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the inventory is empty (never true for a constructed set).
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The tag string at `idx`.
    pub fn tag(&self, idx: usize) -> Option<&str> {
        self.tags.get(idx).map(String::as_str)
    }

    /// The index of `tag`.
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    /// Whether moving from tag `prev` to tag `next` is allowed under the
    /// BIO scheme.
    pub fn is_valid_transition(&self, prev: usize, next: usize) -> bool {
        let (Some(prev_tag), Some(next_tag)) = (self.tags.get(prev), self.tags.get(next)) else {
            return false;
        };
        match next_tag.strip_prefix("I-") {
            Some(entity) => {
                prev_tag.strip_prefix("B-") == Some(entity)
                    || prev_tag.strip_prefix("I-") == Some(entity)
            }
            None => true,
        }
    }

    /// Pre-computed `[prev][next]` constraint mask for the decoder.
    pub fn transition_mask(&self) -> Vec<Vec<bool>> {
        let n = self.tags.len();
        (0..n)
            .map(|prev| (0..n).map(|next| self.is_valid_transition(prev, next)).collect())
            .collect()
    }
}
