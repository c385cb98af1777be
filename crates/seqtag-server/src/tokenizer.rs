//! # Blank tokenizer
//!
//! Language-tagged rule tokenizer for raw request sentences: splits on
//! whitespace and isolates punctuation, preserving token order. Tokens are
//! emitted as `{"value": text}` records, the field shape the dataset and
//! features consume.

use regex::Regex;
use seqtag_core::{Sentence, TokenFields};

/// Field name tokenized text is stored under.
const VALUE_FIELD: &str = "value";

/// A blank (rule-only) tokenizer for a language code.
#[derive(Debug, Clone)]
pub struct BlankTokenizer {
    language: String,
    token_re: Regex,
}

impl BlankTokenizer {
    /// Create a tokenizer for `language` (e.g. `"pl"`, `"en"`).
    ///
    /// The language code is carried for diagnostics; the rule set itself is
    /// language-independent: word characters group, everything else splits.
    pub fn new(language: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            language: language.into(),
            token_re: Regex::new(r"\w+|[^\w\s]")?,
        })
    }

    /// The language code this tokenizer was created for.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Split a sentence into token strings, in order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.token_re
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Split a sentence into `{"value": token}` records.
    pub fn tokenize_to_records(&self, text: &str) -> Sentence {
        self.tokenize(text)
            .into_iter()
            .map(|token| {
                let mut fields = TokenFields::new();
                fields.insert(VALUE_FIELD.to_string(), token);
                fields
            })
            .collect()
    }
}
