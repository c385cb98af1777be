//! # Bidirectional language-model wrapper
//!
//! Loads the contextual embedding model from an embedding directory
//! (`options.json` hyperparameters + `weights.hdf5` weights) and exposes
//! per-layer embedding outputs, plus the learned layer combination that
//! collapses them into a single per-token embedding. The model's internal
//! numerics are not part of any contract here; callers depend only on the
//! output shapes and on weight reuse.

use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Embedding, Init, Linear, Module, VarBuilder, embedding, linear};
use tracing::debug;

use crate::error::{Result, SeqtagError};

/// Hyperparameter descriptor loaded from `options.json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BilmOptions {
    /// Size of the sub-token id space the char embedding covers.
    pub char_vocab_size: usize,
    /// Dimension of the per-sub-token embedding.
    pub char_embed_dim: usize,
    /// Dimension of each contextual layer output.
    pub projection_dim: usize,
    /// Number of stacked contextual layers.
    pub num_layers: usize,
}

impl BilmOptions {
    /// Read options from a JSON descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SeqtagError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// The frozen bidirectional LM: a char embedding followed by a stack of
/// projected layers, each contributing one contextual output.
#[derive(Debug)]
pub struct BidirectionalLm {
    char_embed: Embedding,
    layers: Vec<Linear>,
}

impl BidirectionalLm {
    /// Load the model weights from a weight file via memory mapping.
    pub fn load(options: &BilmOptions, weights_path: &Path, device: &Device) -> Result<Self> {
        if !weights_path.exists() {
            return Err(SeqtagError::MissingResource {
                path: weights_path.to_path_buf(),
            });
        }

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device) }
                .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?;

        let char_embed = embedding(
            options.char_vocab_size,
            options.char_embed_dim,
            vb.pp("char_embed"),
        )
        .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?;

        let mut layers = Vec::with_capacity(options.num_layers);
        for i in 0..options.num_layers {
            let in_dim = if i == 0 {
                options.char_embed_dim
            } else {
                options.projection_dim
            };
            let layer = linear(in_dim, options.projection_dim, vb.pp(format!("layer_{i}")))
                .map_err(|e| SeqtagError::ModelLoad(e.to_string()))?;
            layers.push(layer);
        }
        debug!(layers = layers.len(), "bidirectional LM loaded");

        Ok(Self { char_embed, layers })
    }

    /// Number of contextual layer outputs `forward` produces.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Compute per-layer contextual outputs for a sub-token id batch of
    /// shape `(batch, tokens, sub_token_length)`. Each output has shape
    /// `(batch, tokens, projection_dim)`.
    pub fn forward(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        let ids = input.to_dtype(DType::I64)?;
        // (batch, tokens, sub_len, char_embed_dim), pooled over sub-tokens.
        let chars = self.char_embed.forward(&ids)?;
        let mut hidden = chars.mean(2)?;

        let mut outputs = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?.tanh()?;
            outputs.push(hidden.clone());
        }
        Ok(outputs)
    }
}

/// Learned softmax-weighted combination of per-layer outputs.
///
/// Weights start at zero (uniform after softmax, matching an
/// L2-regularized-to-zero setup) and gamma at one. The variables live in
/// the graph's `VarMap` under the owning feature's namespace, so features
/// sharing a name share these parameters.
pub struct ScalarMix {
    weights: Tensor,
    gamma: Tensor,
}

impl ScalarMix {
    /// Register (or re-attach to) mix parameters under `vb`'s prefix.
    pub fn new(vb: VarBuilder, num_layers: usize) -> Result<Self> {
        let weights = vb.get_with_hints((num_layers,), "weights", Init::Const(0.0))?;
        let gamma = vb.get_with_hints((1,), "gamma", Init::Const(1.0))?;
        Ok(Self { weights, gamma })
    }

    /// Collapse per-layer outputs `(batch, tokens, dim)` into one tensor of
    /// the same shape.
    pub fn forward(&self, layers: &[Tensor]) -> Result<Tensor> {
        if layers.is_empty() {
            return Err(SeqtagError::EmptyInput);
        }
        let stacked = Tensor::stack(layers, 0)?;
        let norm = candle_nn::ops::softmax(&self.weights, 0)?;
        let norm = norm.reshape((layers.len(), 1, 1, 1))?;
        let mixed = stacked.broadcast_mul(&norm)?.sum(0)?;
        Ok(mixed.broadcast_mul(&self.gamma)?)
    }
}

/// A loaded bidirectional LM together with its layer mix; one per feature
/// name, shared through the model graph registry.
pub struct BilmEmbedder {
    lm: BidirectionalLm,
    mix: ScalarMix,
}

impl BilmEmbedder {
    pub fn new(lm: BidirectionalLm, mix: ScalarMix) -> Self {
        Self { lm, mix }
    }

    /// Embed a sub-token id batch `(batch, tokens, sub_token_length)` into
    /// `(batch, tokens, projection_dim)`.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let layers = self.lm.forward(input)?;
        self.mix.forward(&layers)
    }
}
