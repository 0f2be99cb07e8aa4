//! Core signal processing: decoding, DSP, augmentation and feature extraction

pub mod analysis;
pub mod augment;
pub mod decoder;
pub mod dsp;

pub use analysis::{FeatureMatrix, MfccExtractor, MfccParams};
pub use augment::{AugmentationKind, Augmented, AugmentParams, Augmenter};
pub use decoder::{decode_audio, load_waveform, AudioData};
