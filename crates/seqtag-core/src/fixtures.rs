//! Shared on-disk fixtures for unit tests: a complete embedding directory
//! (vocabulary, options descriptor, weight file) small enough to load on CPU.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use candle_core::{DType, Device, Tensor};

use crate::bilm::BilmOptions;

/// A small but valid hyperparameter descriptor.
pub(crate) fn small_options() -> BilmOptions {
    BilmOptions {
        char_vocab_size: 261,
        char_embed_dim: 8,
        projection_dim: 12,
        num_layers: 2,
    }
}

/// Populate `dir` with the three resources an embedding directory must hold.
pub(crate) fn write_embedding_dir(dir: &Path, options: &BilmOptions, vocab: &[&str]) {
    let mut vocab_file = fs::File::create(dir.join("vocabulary.txt")).unwrap();
    for word in vocab {
        writeln!(vocab_file, "{word}").unwrap();
    }

    let mut options_file = fs::File::create(dir.join("options.json")).unwrap();
    write!(
        options_file,
        "{}",
        serde_json::to_string(options).unwrap()
    )
    .unwrap();

    write_weights(dir, options);
}

/// Write a deterministic-shape (random-valued) weight file for `options`.
pub(crate) fn write_weights(dir: &Path, options: &BilmOptions) {
    let dev = Device::Cpu;
    let mut tensors = HashMap::new();
    tensors.insert(
        "char_embed.weight".to_string(),
        Tensor::randn(
            0f32,
            0.1,
            (options.char_vocab_size, options.char_embed_dim),
            &dev,
        )
        .unwrap(),
    );
    for i in 0..options.num_layers {
        let in_dim = if i == 0 {
            options.char_embed_dim
        } else {
            options.projection_dim
        };
        tensors.insert(
            format!("layer_{i}.weight"),
            Tensor::randn(0f32, 0.1, (options.projection_dim, in_dim), &dev).unwrap(),
        );
        tensors.insert(
            format!("layer_{i}.bias"),
            Tensor::zeros((options.projection_dim,), DType::F32, &dev).unwrap(),
        );
    }
    candle_core::safetensors::save(&tensors, dir.join("weights.hdf5")).unwrap();
}
