//! Model export for in-browser inference

mod tfjs;

pub use tfjs::{
    conv_kernel_to_keras, dense_kernel_to_keras, export_tfjs, model_topology, ExportSummary,
    LayersModelJson, Preprocessing, WeightEntry, WeightsGroup, LABELS_JSON, MODEL_JSON,
    PREPROCESSING_JSON, WEIGHTS_SHARD,
};

use anyhow::Result;
use std::path::Path;

use crate::training::ModelArtifact;

/// Load a trained artifact and re-encode it as a TF.js layers model
pub fn convert_model(model_path: &Path, output_dir: &Path) -> Result<ExportSummary> {
    let artifact = ModelArtifact::load(model_path)?;
    export_tfjs(&artifact, output_dir)
}
