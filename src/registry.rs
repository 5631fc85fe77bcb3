//! Name-keyed registry of box-head predictor builders.
//!
//! The registry decouples predictor selection from predictor implementation:
//! the model builder asks for whatever name the configuration carries, and
//! new variants plug in without touching the factory. It is an explicit
//! value, built once at startup and passed to [`make_roi_box_predictor`],
//! and append-only after that; lookups take `&self`, so sharing it across
//! model-build calls needs no locking.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::PredictorError;
use crate::models::{BoxPredictor, FPNPredictor, FastRCNNPredictor};

/// Constructor signature every registered predictor variant satisfies.
pub type PredictorBuilder<B> = fn(
    &ModelConfig,
    Option<usize>,
    &<B as Backend>::Device,
) -> Result<Box<dyn BoxPredictor<B>>, PredictorError>;

fn build_fast_rcnn<B: Backend>(
    config: &ModelConfig,
    in_channels: Option<usize>,
    device: &B::Device,
) -> Result<Box<dyn BoxPredictor<B>>, PredictorError> {
    Ok(Box::new(FastRCNNPredictor::new(config, in_channels, device)?))
}

fn build_fpn<B: Backend>(
    config: &ModelConfig,
    in_channels: Option<usize>,
    device: &B::Device,
) -> Result<Box<dyn BoxPredictor<B>>, PredictorError> {
    Ok(Box::new(FPNPredictor::new(config, in_channels, device)?))
}

/// Append-only table mapping predictor names to their builders.
#[derive(Debug)]
pub struct PredictorRegistry<B: Backend> {
    builders: BTreeMap<String, PredictorBuilder<B>>,
}

impl<B: Backend> PredictorRegistry<B> {
    /// An empty registry.
    pub fn new() -> Self {
        PredictorRegistry {
            builders: BTreeMap::new(),
        }
    }

    /// The registry with both built-in variants,
    /// `"FastRCNNPredictor"` and `"FPNPredictor"`.
    pub fn with_builtins() -> Self {
        let mut builders: BTreeMap<String, PredictorBuilder<B>> = BTreeMap::new();
        builders.insert("FastRCNNPredictor".into(), build_fast_rcnn);
        builders.insert("FPNPredictor".into(), build_fpn);
        PredictorRegistry { builders }
    }

    /// Registers a builder under `name`.
    ///
    /// Names are claimed for the registry's lifetime; a second registration
    /// under the same name fails rather than silently replacing the first.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        builder: PredictorBuilder<B>,
    ) -> Result<(), PredictorError> {
        match self.builders.entry(name.into()) {
            Entry::Occupied(entry) => Err(PredictorError::AlreadyRegistered {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(builder);
                Ok(())
            }
        }
    }

    /// Looks up the builder registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<PredictorBuilder<B>, PredictorError> {
        self.builders
            .get(name)
            .copied()
            .ok_or_else(|| PredictorError::NotFound {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }
}

impl<B: Backend> Default for PredictorRegistry<B> {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builds the predictor the configuration asks for.
///
/// This is the only point tying the configuration to the available
/// implementations: a name nobody registered surfaces as
/// [`PredictorError::NotFound`] here, before any tensor work happens.
pub fn make_roi_box_predictor<B: Backend>(
    registry: &PredictorRegistry<B>,
    config: &ModelConfig,
    in_channels: Option<usize>,
    device: &B::Device,
) -> Result<Box<dyn BoxPredictor<B>>, PredictorError> {
    let name = config.roi_box_head.predictor.as_str();
    let builder = registry.lookup(name)?;
    debug!("building roi box predictor: {}", name);
    builder(config, in_channels, device)
}
