//! # Contextual embedding feature
//!
//! A [`Feature`] backed by a pre-trained bidirectional LM. `transform`
//! delegates to a vocabulary-driven [`Encoder`] built from the embedding
//! directory; the encoder is expensive to construct and is excluded from
//! serialized state, then rebuilt deterministically on deserialization from
//! the stored directory path.

use std::path::{Path, PathBuf};

use candle_core::{DType, Tensor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::encoder::Encoder;
use crate::error::{Result, SeqtagError};
use crate::feature::{Feature, InputSpec};
use crate::graph::ModelGraph;

/// Fixed number of sub-token ids each word is encoded into. Independent of
/// sentence length.
pub const SUB_TOKEN_LENGTH: usize = 50;

/// Default value for the feature-level padding parameter.
pub const DEFAULT_PADDING: usize = 80;

/// Resources an embedding directory must contain.
const VOCABULARY_FILE: &str = "vocabulary.txt";
const OPTIONS_FILE: &str = "options.json";
const WEIGHTS_FILE: &str = "weights.hdf5";

/// Durable state of an [`EmbeddingFeature`]: everything except the encoder.
///
/// This is the on-disk representation; (de)serialization of the feature
/// routes through it so the encoder never reaches the persisted format and
/// is rebuilt from `embedding_dir` on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingFeatureConfig {
    pub name: String,
    pub embedding_dir: PathBuf,
    #[serde(default = "default_padding")]
    pub padding: usize,
}

fn default_padding() -> usize {
    DEFAULT_PADDING
}

/// A contextual word-embedding feature.
///
/// Two features constructed from the same `embedding_dir` behave
/// identically; the encoder is derived state, not identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EmbeddingFeatureConfig", into = "EmbeddingFeatureConfig")]
pub struct EmbeddingFeature {
    name: String,
    embedding_dir: PathBuf,
    // Accepted and persisted, but the dataset's own sentence-length cutoff
    // is authoritative for truncation.
    padding: usize,
    encoder: Encoder,
}

impl EmbeddingFeature {
    /// Construct the feature and eagerly build its encoder.
    ///
    /// All three embedding resources (`vocabulary.txt`, `options.json`,
    /// `weights.hdf5`) must exist under `embedding_dir`; a missing one is a
    /// fatal construction-time failure with no degraded mode.
    pub fn new(
        name: impl Into<String>,
        embedding_dir: impl Into<PathBuf>,
        padding: usize,
    ) -> Result<Self> {
        let name = name.into();
        let embedding_dir = embedding_dir.into();

        for file in [VOCABULARY_FILE, OPTIONS_FILE, WEIGHTS_FILE] {
            let path = embedding_dir.join(file);
            if !path.exists() {
                return Err(SeqtagError::MissingResource { path });
            }
        }

        let encoder = Encoder::new(embedding_dir.join(VOCABULARY_FILE), SUB_TOKEN_LENGTH)?;
        debug!(name = %name, dir = %embedding_dir.display(), "embedding feature ready");

        Ok(Self {
            name,
            embedding_dir,
            padding,
            encoder,
        })
    }

    /// Construct with the default padding parameter.
    pub fn with_default_padding(
        name: impl Into<String>,
        embedding_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::new(name, embedding_dir, DEFAULT_PADDING)
    }

    /// The embedding directory this feature was built from.
    pub fn embedding_dir(&self) -> &Path {
        &self.embedding_dir
    }

    /// The feature-level padding parameter.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// The encoder's fixed per-word sub-token length.
    pub fn sub_token_length(&self) -> usize {
        self.encoder.max_word_length()
    }

    pub(crate) fn options_file(&self) -> PathBuf {
        self.embedding_dir.join(OPTIONS_FILE)
    }

    pub(crate) fn weights_file(&self) -> PathBuf {
        self.embedding_dir.join(WEIGHTS_FILE)
    }
}

impl Feature for EmbeddingFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn input(&self) -> InputSpec {
        InputSpec {
            name: format!("{}_embedding_input", self.name),
            shape: vec![None, Some(self.encoder.max_word_length())],
            dtype: DType::I64,
        }
    }

    fn model(&self, graph: &mut ModelGraph, input: &Tensor) -> Result<Tensor> {
        let ids = input.to_dtype(DType::I64)?;
        let embedder = graph.embedder(&self.name, &self.options_file(), &self.weights_file())?;
        embedder.forward(&ids)
    }

    fn transform(&self, dataset: &Dataset) -> Result<Tensor> {
        let cutoff = dataset.sentence_length();
        let mut text = Vec::with_capacity(dataset.len());

        for sentence in dataset {
            let mut words = Vec::with_capacity(sentence.len().min(cutoff));
            for (idx, token) in sentence.iter().enumerate() {
                if idx >= cutoff {
                    break;
                }
                let value = token.get(&self.name).ok_or_else(|| {
                    SeqtagError::Encode(format!(
                        "token {idx} is missing field {:?}",
                        self.name
                    ))
                })?;
                words.push(value.clone());
            }
            text.push(words);
        }

        self.encoder.batch_sentences(&text)
    }
}

impl From<EmbeddingFeature> for EmbeddingFeatureConfig {
    fn from(feature: EmbeddingFeature) -> Self {
        Self {
            name: feature.name,
            embedding_dir: feature.embedding_dir,
            padding: feature.padding,
        }
    }
}

impl TryFrom<EmbeddingFeatureConfig> for EmbeddingFeature {
    type Error = SeqtagError;

    /// Restore from durable state, rebuilding the encoder with the same
    /// deterministic rule as at original construction. Fails if the
    /// embedding directory moved or was deleted since serialization.
    fn try_from(config: EmbeddingFeatureConfig) -> Result<Self> {
        Self::new(config.name, config.embedding_dir, config.padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DatasetMeta, sentence_from_words};
    use crate::fixtures::{small_options, write_embedding_dir};
    use std::fs;
    use std::sync::Arc;

    fn embedding_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_embedding_dir(dir.path(), &small_options(), &["the", "cat", "sat"]);
        dir
    }

    fn dataset(cutoff: usize, sentences: &[&[&str]]) -> Dataset {
        let meta = DatasetMeta {
            tags: vec!["O".into(), "B-PER".into(), "I-PER".into()],
            labels: None,
        };
        let mut ds = Dataset::from_meta(meta, vec!["value".into()], cutoff);
        ds.set_data(
            sentences
                .iter()
                .map(|words| sentence_from_words("value", words))
                .collect(),
        );
        ds
    }

    #[test]
    fn construction_requires_all_three_resources() {
        for missing in ["vocabulary.txt", "options.json", "weights.hdf5"] {
            let dir = embedding_dir();
            fs::remove_file(dir.path().join(missing)).unwrap();

            let err = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap_err();
            match err {
                SeqtagError::MissingResource { path } => {
                    assert!(path.ends_with(missing), "wrong path for {missing}: {path:?}");
                }
                other => panic!("expected MissingResource, got {other}"),
            }
        }
    }

    #[test]
    fn input_spec_is_stable_and_namespaced() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let spec = feature.input();
        assert_eq!(spec.name, "value_embedding_input");
        assert_eq!(spec.shape, vec![None, Some(SUB_TOKEN_LENGTH)]);
        assert_eq!(spec.dtype, DType::I64);
        assert_eq!(feature.input(), spec);

        let other = EmbeddingFeature::with_default_padding("lemma", dir.path()).unwrap();
        assert_ne!(other.input().name, spec.name);
    }

    #[test]
    fn transform_batches_to_longest_sentence() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let ds = dataset(10, &[&["The", "cat", "sat"], &["Hi"]]);
        let batch = feature.transform(&ds).unwrap();
        // Padded to the longer sentence's length of 3, not the cutoff of 10.
        assert_eq!(batch.dims(), &[2, 3, SUB_TOKEN_LENGTH]);
    }

    #[test]
    fn transform_truncates_at_the_dataset_cutoff() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let full = dataset(10, &[&["a", "b"]]);
        let truncated = dataset(2, &[&["a", "b", "c", "d"]]);

        let expected = feature.transform(&full).unwrap();
        let got = feature.transform(&truncated).unwrap();
        assert_eq!(got.dims(), &[1, 2, SUB_TOKEN_LENGTH]);
        assert_eq!(
            got.to_vec3::<i64>().unwrap(),
            expected.to_vec3::<i64>().unwrap()
        );
    }

    #[test]
    fn transform_fails_on_missing_field() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("lemma", dir.path()).unwrap();

        let ds = dataset(10, &[&["The"]]);
        let err = feature.transform(&ds).unwrap_err();
        assert!(matches!(err, SeqtagError::Encode(_)));
    }

    #[test]
    fn serialized_state_excludes_the_encoder() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::new("value", dir.path(), 64).unwrap();

        let json = serde_json::to_value(&feature).unwrap();
        assert!(json.get("encoder").is_none());
        assert_eq!(json["name"], "value");
        assert_eq!(json["padding"], 64);
    }

    #[test]
    fn roundtrip_restores_identical_transform_output() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let json = serde_json::to_string(&feature).unwrap();
        let restored: EmbeddingFeature = serde_json::from_str(&json).unwrap();

        let ds = dataset(10, &[&["The", "cat", "sat"], &["Hi"]]);
        let before = feature.transform(&ds).unwrap();
        let after = restored.transform(&ds).unwrap();
        assert_eq!(
            before.to_vec3::<i64>().unwrap(),
            after.to_vec3::<i64>().unwrap()
        );
        assert_eq!(restored.padding(), feature.padding());
    }

    #[test]
    fn restore_fails_when_embedding_dir_is_gone() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();
        let json = serde_json::to_string(&feature).unwrap();

        dir.close().unwrap();
        let result: std::result::Result<EmbeddingFeature, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn model_embeds_the_transformed_batch() {
        let dir = embedding_dir();
        let feature = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let ds = dataset(10, &[&["The", "cat", "sat"], &["Hi"]]);
        let batch = feature.transform(&ds).unwrap();

        let mut graph = ModelGraph::new(candle_core::Device::Cpu);
        let emb = feature.model(&mut graph, &batch).unwrap();
        assert_eq!(emb.dims(), &[2, 3, small_options().projection_dim]);
    }

    #[test]
    fn features_sharing_a_name_share_graph_state() {
        let dir = embedding_dir();
        let a = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();
        let b = EmbeddingFeature::with_default_padding("value", dir.path()).unwrap();

        let ds = dataset(10, &[&["Hi"]]);
        let batch = a.transform(&ds).unwrap();

        let mut graph = ModelGraph::new(candle_core::Device::Cpu);
        a.model(&mut graph, &batch).unwrap();
        let vars = graph.variable_names();
        b.model(&mut graph, &batch).unwrap();

        // The second build reused the registered embedder: no new variables.
        assert_eq!(graph.variable_names(), vars);
    }

    #[test]
    fn feature_trait_object_is_shareable() {
        let dir = embedding_dir();
        let feature: Arc<dyn Feature> =
            Arc::new(EmbeddingFeature::with_default_padding("value", dir.path()).unwrap());
        assert_eq!(feature.name(), "value");
    }
}
