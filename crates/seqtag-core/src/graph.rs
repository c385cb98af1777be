//! # Model graph registry
//!
//! The reuse-safe "variable scope" of this crate: an explicit registry that
//! keys shared sub-graph state by feature name. Building an embedder twice
//! under the same name returns the same instance, so layer-mix parameters
//! are shared instead of duplicated; distinct names get distinct variable
//! prefixes in the underlying `VarMap`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use tracing::debug;

use crate::bilm::{BidirectionalLm, BilmEmbedder, BilmOptions, ScalarMix};
use crate::error::Result;

/// Owns the device, the trainable variables, and the per-name embedder
/// registry for one composed model.
pub struct ModelGraph {
    device: Device,
    varmap: VarMap,
    embedders: HashMap<String, Arc<BilmEmbedder>>,
}

impl std::fmt::Debug for ModelGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGraph")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl ModelGraph {
    /// Create an empty graph bound to a device. The device must be chosen
    /// once per process, before any graph state is built.
    pub fn new(device: Device) -> Self {
        Self {
            device,
            varmap: VarMap::new(),
            embedders: HashMap::new(),
        }
    }

    /// The device this graph's tensors live on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get or build the embedder registered under `name`.
    ///
    /// A registry hit returns the already-built embedder without touching
    /// the resource files, which is what makes repeated graph construction
    /// with the same name idempotent.
    pub fn embedder(
        &mut self,
        name: &str,
        options_file: &Path,
        weights_file: &Path,
    ) -> Result<Arc<BilmEmbedder>> {
        if let Some(embedder) = self.embedders.get(name) {
            return Ok(Arc::clone(embedder));
        }

        let options = BilmOptions::from_file(options_file)?;
        let lm = BidirectionalLm::load(&options, weights_file, &self.device)?;
        let vb = VarBuilder::from_varmap(&self.varmap, DType::F32, &self.device);
        let mix = ScalarMix::new(vb.pp(name).pp("scalar_mix"), options.num_layers)?;
        debug!(name, "registered embedder");

        let embedder = Arc::new(BilmEmbedder::new(lm, mix));
        self.embedders.insert(name.to_string(), Arc::clone(&embedder));
        Ok(embedder)
    }

    /// Whether an embedder is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.embedders.contains_key(name)
    }

    /// Names of all variables registered so far, namespace-prefixed.
    pub fn variable_names(&self) -> Vec<String> {
        let data = self.varmap.data().lock().unwrap();
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        names
    }
}
