//! Feature extraction

pub mod mel;
pub mod mfcc;

pub use mfcc::{analyze_mfcc, FeatureMatrix, MfccExtractor, MfccParams};
