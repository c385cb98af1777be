//! # Feature abstraction
//!
//! A feature is a pluggable unit that declares a named symbolic model input
//! and knows how to turn raw dataset records into concrete values for that
//! input. The tagging model composes zero or more features: it calls
//! [`Feature::transform`] once per dataset to assemble model inputs and
//! [`Feature::input`]/[`Feature::model`] when building the model graph.

pub mod embedding;

use candle_core::{DType, Tensor};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::graph::ModelGraph;

pub use embedding::{DEFAULT_PADDING, EmbeddingFeature, SUB_TOKEN_LENGTH};

/// Description of a feature's symbolic input placeholder: a declared, not
/// yet materialized tensor slot in the composed model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Unique node name, derived from the feature name.
    pub name: String,
    /// Per-sentence shape; `None` marks a dimension left unbound.
    pub shape: Vec<Option<usize>>,
    /// Element type the concrete batch must carry.
    pub dtype: DType,
}

/// A pluggable model input: symbolic declaration plus concrete encoding.
///
/// Identity (`name` and configuration) is immutable after construction;
/// only lazily rebuilt internal resources may change.
pub trait Feature: Send + Sync {
    /// Stable identifier. Used as the key into per-token field maps and as
    /// the namespace prefix for graph-node names.
    fn name(&self) -> &str;

    /// The symbolic input placeholder this feature declares. Stable across
    /// repeated calls.
    fn input(&self) -> InputSpec;

    /// Splice this feature's sub-graph into `graph`, consuming a tensor
    /// compatible with [`Feature::input`] and returning the feature's
    /// embedding contribution. Sub-graph state is registered under the
    /// feature's name; repeated calls with the same name reuse it.
    fn model(&self, graph: &mut ModelGraph, input: &Tensor) -> Result<Tensor>;

    /// Encode the dataset's raw field values into a concrete batch matching
    /// the declared placeholder shape, batched over all sentences.
    ///
    /// Sentences longer than the dataset's sentence-length cutoff are
    /// silently truncated; shorter ones are padded downstream by the
    /// encoder, never here.
    fn transform(&self, dataset: &Dataset) -> Result<Tensor>;
}
