//! # Prediction handler
//!
//! The serving adapter around the core: holds the loaded model and a
//! template dataset, copies the template per request (so its schema and
//! cutoff are reused without mutation), injects the caller's records, and
//! shapes the prediction into the response body. The blank tokenizer is
//! constructed lazily on first use and cached for the handler's lifetime.

use std::path::Path;

use candle_core::Device;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;

use seqtag_core::{CrfTagger, Dataset, Prediction, Result, Sentence, TaggingModel};

use crate::tokenizer::BlankTokenizer;

/// Response body: tag sequences, plus label sequences only when the model
/// has a second output head. A single-sequence prediction must not expose
/// a `labels` key at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub tags: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Vec<String>>>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        match prediction {
            Prediction::Tags(tags) => Self { tags, labels: None },
            Prediction::TagsWithLabels { tags, labels } => Self {
                tags,
                labels: Some(labels),
            },
        }
    }
}

/// Serving adapter: model + template dataset + lazily built tokenizer.
pub struct PredictionHandler {
    model: Box<dyn TaggingModel>,
    template: Dataset,
    language: String,
    tokenizer: OnceCell<BlankTokenizer>,
}

impl PredictionHandler {
    /// Wrap an already loaded model and template dataset.
    pub fn new(
        model: Box<dyn TaggingModel>,
        template: Dataset,
        language: impl Into<String>,
    ) -> Self {
        Self {
            model,
            template,
            language: language.into(),
            tokenizer: OnceCell::new(),
        }
    }

    /// Load the tagging model and template dataset from a model directory.
    pub fn from_model_dir(
        model_dir: impl AsRef<Path>,
        fieldnames: Vec<String>,
        padding: usize,
        language: impl Into<String>,
        device: Device,
    ) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let model = CrfTagger::load(model_dir, device)?;
        let template = Dataset::empty(model_dir.join("meta.json"), fieldnames, padding)?;
        info!(dir = %model_dir.display(), padding, "prediction handler ready");
        Ok(Self::new(Box::new(model), template, language))
    }

    /// Run the model over the caller's records and shape the response.
    pub fn predict(&self, records: Vec<Sentence>) -> Result<PredictResponse> {
        let mut data = self.template.copy();
        data.set_data(records);
        Ok(self.model.predict(&data)?.into())
    }

    /// Tokenize raw sentences into token records, building the tokenizer
    /// on first use.
    pub fn tokenize(&self, sentences: &[String]) -> std::result::Result<Vec<Sentence>, regex::Error> {
        let tokenizer = self
            .tokenizer
            .get_or_try_init(|| BlankTokenizer::new(&self.language))?;
        Ok(sentences
            .iter()
            .map(|s| tokenizer.tokenize_to_records(s))
            .collect())
    }
}
