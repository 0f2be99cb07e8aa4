// src/error.rs
//
// Domain errors for the dataset, training and export stages.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("class directory not found: {}", .0.display())]
    MissingClassDir(PathBuf),

    #[error("no class directories found under {}", .0.display())]
    NoClasses(PathBuf),

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("degenerate dataset: {0}")]
    DegenerateDataset(String),

    #[error("shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
}
