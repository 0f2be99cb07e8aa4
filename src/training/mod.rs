//! CNN training and model artifacts

mod artifact;
mod model;
mod trainer;

pub use artifact::{ModelArtifact, TensorF32, ARTIFACT_FORMAT};
pub use model::{BreathClassifier, ModelArchitecture};
pub use trainer::{EpochMetrics, Trainer, TrainedModel, TrainingReport};

#[cfg(test)]
pub(crate) use artifact::tests::sample_artifact;
