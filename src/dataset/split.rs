// src/dataset/split.rs
//
// Global amplitude normalization and the seeded train/test partition.

use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::core::analysis::FeatureMatrix;

/// Result of global normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Every value was divided by this maximum absolute value
    Scaled { max_abs: f32 },
    /// The maximum was zero; values were left unchanged
    AllZero,
}

/// Divide every value by the collection-wide maximum absolute value
///
/// A zero maximum leaves the features untouched and reports
/// [`Normalization::AllZero`] instead of dividing by zero.
pub fn normalize_global(features: &mut [FeatureMatrix]) -> Normalization {
    let max_abs = features.iter().map(FeatureMatrix::max_abs).fold(0.0f32, f32::max);

    if max_abs <= 0.0 {
        warn!("All feature values are zero; skipping normalization");
        return Normalization::AllZero;
    }

    for matrix in features.iter_mut() {
        for v in matrix.data.iter_mut() {
            *v /= max_abs;
        }
    }
    Normalization::Scaled { max_abs }
}

/// Disjoint index partition of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` indices for testing
pub fn train_test_split(n: usize, test_fraction: f32, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = test_size(n, test_fraction);
    let train = indices.split_off(n_test);
    Split { train, test: indices }
}

fn test_size(n: usize, test_fraction: f32) -> usize {
    // Round the product first so 0.2 * 100 is 20, not 21
    let raw = (n as f64 * test_fraction as f64 * 1e6).round() / 1e6;
    (raw.ceil() as usize).min(n)
}
