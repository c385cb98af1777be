use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during seqtag core operations.
#[derive(Debug, Error)]
pub enum SeqtagError {
    /// The input batch is empty.
    #[error("input batch is empty")]
    EmptyInput,

    /// A required embedding resource is missing from the embedding directory.
    #[error("missing embedding resource: {path}")]
    MissingResource {
        /// The resolved path that does not exist.
        path: PathBuf,
    },

    /// A configuration or metadata file could not be interpreted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A dataset record could not be encoded for the model.
    #[error("encoding error: {0}")]
    Encode(String),

    /// The model weights could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Tag-sequence decoding failed.
    #[error("decoding error: {0}")]
    Decode(String),

    /// Tensor construction or inference failed.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// I/O failure while reading a resource.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for seqtag operations.
pub type Result<T> = std::result::Result<T, SeqtagError>;
