//! # Seqtag Core
//!
//! Feature encoding and inference core of the seqtag tagging server.
//! Provides the pluggable [`Feature`] abstraction, the contextual
//! [`EmbeddingFeature`] with its serialization lifecycle, the dataset
//! container, and a CRF tagging model behind the [`TaggingModel`] trait.
//!
//! ## Quick start
//!
//! ```no_run
//! use seqtag_core::{Dataset, EmbeddingFeature, Feature};
//!
//! let feature = EmbeddingFeature::with_default_padding("value", "models/elmo").unwrap();
//! let dataset = Dataset::empty("models/tagger/meta.json", vec!["value".into()], 80).unwrap();
//! let batch = feature.transform(&dataset);
//! ```
pub mod bilm;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod feature;
pub mod graph;
pub mod tagger;
pub mod tags;
pub mod viterbi;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export primary API
pub use dataset::{Dataset, DatasetMeta, Sentence, TokenFields, sentence_from_words};
pub use encoder::Encoder;
pub use error::{Result, SeqtagError};
pub use feature::{
    DEFAULT_PADDING, EmbeddingFeature, Feature, InputSpec, SUB_TOKEN_LENGTH,
};
pub use graph::ModelGraph;
pub use tagger::{CrfTagger, Prediction, TaggerConfig, TaggingModel};
pub use tags::TagSet;
pub use viterbi::ViterbiDecoder;
