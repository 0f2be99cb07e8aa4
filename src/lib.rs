//! breathnet - Breath vs. noise audio classifier pipeline
//!
//! Prepares a labeled audio dataset, augments it, trains a small
//! convolutional classifier and exports the model for in-browser inference.
//!
//! ## Pipeline
//!
//! raw files → augmenter → dataset builder → feature tensor → trainer →
//! saved model → exporter. No stage reads back from a later one.
//!
//! ## Module Structure
//!
//! - `core` - Decoding, DSP, augmentation and MFCC extraction
//! - `dataset` - Labeled feature dataset, label map, normalization, split
//! - `training` - CNN model, training loop and safetensors artifact
//! - `export` - TensorFlow.js layers-model writer
//! - `config` - Shared pipeline configuration
//! - `cli` - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use breathnet::{DatasetBuilder, PipelineConfig, Trainer};
//!
//! let config = PipelineConfig::default();
//! let dataset = DatasetBuilder::new(&config)?.build(&config.dataset_root)?;
//! let trained = Trainer::new(&config)?.train(dataset)?;
//! trained.save(&config.model_path)?;
//!
//! breathnet::export::convert_model(&config.model_path, &config.export_dir)?;
//! ```
//!
//! ## Augmentation
//!
//! | Variant      | Transform                                  | Length      |
//! |--------------|--------------------------------------------|-------------|
//! | noise        | + 0.02 × N(0, 1) per sample                | unchanged   |
//! | time_shift   | circular roll by up to ±20% of the length  | unchanged   |
//! | pitch_shift  | +1 semitone, duration preserved            | unchanged   |
//! | speed_change | 1.1× phase-vocoder time stretch            | shorter     |
//!
//! Every source file yields five examples: the original plus four variants,
//! each length-normalized to one second before feature extraction.

// Core signal processing
pub mod core;

// Command-line interface
pub mod cli;

// Configuration
pub mod config;

// Labeled feature dataset
pub mod dataset;

pub mod error;

// Model export
pub mod export;

// Model and training loop
pub mod training;

// Re-export commonly used types at crate root for convenience
pub use config::{DecodeErrorPolicy, PipelineConfig};
pub use core::{AudioData, Augmenter, AugmentationKind, FeatureMatrix, MfccExtractor, MfccParams};
pub use dataset::{Dataset, DatasetBuilder, LabelMap, Normalization, Split};
pub use error::PipelineError;
pub use training::{ModelArchitecture, ModelArtifact, Trainer, TrainedModel, TrainingReport};
