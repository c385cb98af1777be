//! # CRF tagging model
//!
//! Composes embedding features into a sequence tagger: per-feature
//! embeddings are concatenated, projected to per-tag emission scores, and
//! Viterbi-decoded under BIO transition constraints. Models with a second
//! output head additionally produce per-sentence label sequences.
//!
//! The serving layer depends only on the [`TaggingModel`] trait; training
//! and architecture search live elsewhere.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder, linear};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bilm::BilmOptions;
use crate::dataset::{Dataset, DatasetMeta};
use crate::error::{Result, SeqtagError};
use crate::feature::{EmbeddingFeature, Feature};
use crate::graph::ModelGraph;
use crate::tags::TagSet;
use crate::viterbi::ViterbiDecoder;

/// The outcome of a prediction: always tag sequences, optionally a second
/// label sequence per sentence when the model carries a label head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    Tags(Vec<Vec<String>>),
    TagsWithLabels {
        tags: Vec<Vec<String>>,
        labels: Vec<Vec<String>>,
    },
}

/// Prediction contract the serving layer consumes. Tags come back in
/// string form, one sequence per input sentence, in input order.
pub trait TaggingModel: Send + Sync {
    fn predict(&self, dataset: &Dataset) -> Result<Prediction>;
}

/// Serialized model configuration (`model.json` in the model directory).
///
/// Deserializing this rebuilds every feature's encoder from its stored
/// embedding directory; a moved or deleted directory fails the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    pub features: Vec<EmbeddingFeature>,
}

/// A CRF sequence tagger over embedding features.
#[derive(Debug)]
pub struct CrfTagger {
    features: Vec<EmbeddingFeature>,
    tags: TagSet,
    labels: Option<TagSet>,
    emission: Linear,
    label_emission: Option<Linear>,
    transitions: Vec<Vec<f32>>,
    mask: Vec<Vec<bool>>,
    viterbi: ViterbiDecoder,
    graph: Mutex<ModelGraph>,
}

impl CrfTagger {
    /// Load a tagger from a model directory containing `meta.json` (tag
    /// inventory), `model.json` (feature configuration) and
    /// `model.safetensors` (emission and transition weights).
    pub fn load(model_dir: impl AsRef<Path>, device: Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();

        let meta_path = model_dir.join("meta.json");
        if !meta_path.exists() {
            return Err(SeqtagError::MissingResource { path: meta_path });
        }
        let meta: DatasetMeta = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
        let tags = TagSet::new(meta.tags)?;
        let labels = meta.labels.map(TagSet::new).transpose()?;

        let config_path = model_dir.join("model.json");
        if !config_path.exists() {
            return Err(SeqtagError::MissingResource { path: config_path });
        }
        let config: TaggerConfig = serde_json::from_str(&fs::read_to_string(&config_path)?)?;
        if config.features.is_empty() {
            return Err(SeqtagError::Config("model has no features".into()));
        }

        let mut input_dim = 0;
        for feature in &config.features {
            let options = BilmOptions::from_file(feature.options_file())?;
            input_dim += options.projection_dim;
        }

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(SeqtagError::MissingResource { path: weights_path });
        }
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device) }
                .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?;

        let emission = linear(input_dim, tags.len(), vb.pp("emission"))
            .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?;
        let transitions = vb
            .get((tags.len(), tags.len()), "transitions")
            .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?
            .to_vec2::<f32>()?;
        let label_emission = match &labels {
            Some(label_set) => Some(
                linear(input_dim, label_set.len(), vb.pp("label_emission"))
                    .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?,
            ),
            None => None,
        };

        let mask = tags.transition_mask();
        let viterbi = ViterbiDecoder::new(tags.len());
        info!(
            features = config.features.len(),
            tags = tags.len(),
            "tagging model loaded"
        );

        Ok(Self {
            features: config.features,
            tags,
            labels,
            emission,
            label_emission,
            transitions,
            mask,
            viterbi,
            graph: Mutex::new(ModelGraph::new(device)),
        })
    }

    /// The tag inventory this model predicts over.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The features composed into this model.
    pub fn features(&self) -> &[EmbeddingFeature] {
        &self.features
    }

    /// Concatenated feature embeddings for the dataset,
    /// shape `(sentences, tokens, hidden)`.
    fn embed(&self, dataset: &Dataset) -> Result<Tensor> {
        let mut graph = self
            .graph
            .lock()
            .map_err(|_| SeqtagError::Decode("model graph mutex poisoned".into()))?;

        let mut parts = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let batch = feature.transform(dataset)?;
            let batch = batch.to_device(graph.device())?;
            parts.push(feature.model(&mut graph, &batch)?);
        }
        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Tensor::cat(&parts, candle_core::D::Minus1)?)
        }
    }

    fn decode_tags(&self, dataset: &Dataset, scores: &[Vec<Vec<f32>>]) -> Result<Vec<Vec<String>>> {
        let cutoff = dataset.sentence_length();
        let mut out = Vec::with_capacity(dataset.len());
        for (s, sentence) in dataset.iter().enumerate() {
            let len = sentence.len().min(cutoff);
            let path = self
                .viterbi
                .decode(&scores[s][..len], &self.transitions, &self.mask)?;
            let mut tags = Vec::with_capacity(path.len());
            for idx in path {
                let tag = self
                    .tags
                    .tag(idx)
                    .ok_or_else(|| SeqtagError::Decode(format!("tag index {idx} out of range")))?;
                tags.push(tag.to_string());
            }
            out.push(tags);
        }
        Ok(out)
    }

    fn decode_labels(
        &self,
        dataset: &Dataset,
        label_set: &TagSet,
        scores: &[Vec<Vec<f32>>],
    ) -> Result<Vec<Vec<String>>> {
        let cutoff = dataset.sentence_length();
        let mut out = Vec::with_capacity(dataset.len());
        for (s, sentence) in dataset.iter().enumerate() {
            let len = sentence.len().min(cutoff);
            let mut labels = Vec::with_capacity(len);
            for token_scores in &scores[s][..len] {
                let best = token_scores
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let label = label_set.tag(best).ok_or_else(|| {
                    SeqtagError::Decode(format!("label index {best} out of range"))
                })?;
                labels.push(label.to_string());
            }
            out.push(labels);
        }
        Ok(out)
    }
}

impl TaggingModel for CrfTagger {
    fn predict(&self, dataset: &Dataset) -> Result<Prediction> {
        if dataset.is_empty() {
            return Err(SeqtagError::EmptyInput);
        }

        let hidden = self.embed(dataset)?;
        let scores = self.emission.forward(&hidden)?.to_vec3::<f32>()?;
        let tags = self.decode_tags(dataset, &scores)?;

        match (&self.labels, &self.label_emission) {
            (Some(label_set), Some(head)) => {
                let label_scores = head.forward(&hidden)?.to_vec3::<f32>()?;
                let labels = self.decode_labels(dataset, label_set, &label_scores)?;
                Ok(Prediction::TagsWithLabels { tags, labels })
            }
            _ => Ok(Prediction::Tags(tags)),
        }
    }
}
