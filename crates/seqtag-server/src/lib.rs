//! # Seqtag Server
//!
//! Thin HTTP wrapper around `seqtag-core`: tokenize (optional), populate a
//! dataset, predict, shape the response. All real lifecycle and correctness
//! concerns live in the core crate; this one is plumbing.

pub mod error;
pub mod handler;
pub mod routes;
pub mod tokenizer;

pub use error::ServerError;
pub use handler::{PredictResponse, PredictionHandler};
pub use routes::{PredictRequest, Sentences, SharedHandler, router};
pub use tokenizer::BlankTokenizer;
