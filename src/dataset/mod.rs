//! Labeled feature dataset: building, label mapping, normalization and splitting

mod builder;
mod labels;
mod split;

pub use builder::{DatasetBuilder, EXAMPLES_PER_FILE};
pub use labels::{labels_path_for, LabelMap};
pub use split::{normalize_global, train_test_split, Normalization, Split};

use std::path::PathBuf;

use crate::core::analysis::FeatureMatrix;
use crate::error::PipelineError;

/// Per-class build statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub name: String,
    pub label: u32,
    pub files: usize,
    pub examples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub classes: Vec<ClassSummary>,
    /// Files that failed to decode under the skip policy
    pub skipped: Vec<PathBuf>,
}

/// Parallel feature/label sequences plus the label map that gives them meaning
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Vec<FeatureMatrix>,
    pub labels: Vec<u32>,
    pub label_map: LabelMap,
    pub summary: DatasetSummary,
}

impl Dataset {
    pub fn new(label_map: LabelMap) -> Self {
        Self {
            features: Vec::new(),
            labels: Vec::new(),
            label_map,
            summary: DatasetSummary::default(),
        }
    }

    pub fn push(&mut self, features: FeatureMatrix, label: u32) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Example count per label index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.label_map.len()];
        for &label in &self.labels {
            if let Some(c) = counts.get_mut(label as usize) {
                *c += 1;
            }
        }
        counts
    }

    /// Shape shared by every feature matrix, if there is at least one
    pub fn feature_shape(&self) -> Option<(usize, usize)> {
        self.features.first().map(FeatureMatrix::shape)
    }

    /// Reject datasets a binary classifier cannot learn from
    pub fn validate_for_training(&self) -> Result<(), PipelineError> {
        if self.label_map.len() != 2 {
            return Err(PipelineError::DegenerateDataset(format!(
                "binary classifier needs exactly 2 classes, got {:?}",
                self.label_map.classes
            )));
        }

        for ((_, name), count) in self.label_map.iter().zip(self.class_counts()) {
            if count == 0 {
                return Err(PipelineError::DegenerateDataset(format!(
                    "class '{}' has no examples",
                    name
                )));
            }
        }

        if let Some(shape) = self.feature_shape() {
            if let Some(bad) = self.features.iter().find(|f| f.shape() != shape) {
                return Err(PipelineError::ShapeMismatch {
                    name: "features".to_string(),
                    expected: vec![shape.0, shape.1],
                    actual: vec![bad.frames, bad.coefficients],
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> LabelMap {
        LabelMap::new(vec!["noise".into(), "breath".into()])
    }

    #[test]
    fn test_class_counts_and_validation() {
        let mut dataset = Dataset::new(map());
        dataset.push(FeatureMatrix::zeros(2, 2), 0);
        dataset.push(FeatureMatrix::zeros(2, 2), 0);
        assert_eq!(dataset.class_counts(), vec![2, 0]);
        assert!(matches!(
            dataset.validate_for_training(),
            Err(PipelineError::DegenerateDataset(_))
        ));

        dataset.push(FeatureMatrix::zeros(2, 2), 1);
        assert_eq!(dataset.class_counts(), vec![2, 1]);
        assert!(dataset.validate_for_training().is_ok());
    }

    #[test]
    fn test_three_classes_rejected() {
        let mut dataset = Dataset::new(LabelMap::new(vec!["a".into(), "b".into(), "c".into()]));
        for label in 0..3 {
            dataset.push(FeatureMatrix::zeros(1, 1), label);
        }
        assert!(dataset.validate_for_training().is_err());
    }
}
