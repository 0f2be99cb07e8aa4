// src/config/pipeline.rs
//
// Shared pipeline configuration consumed by dataset build, training and export.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// What to do when an audio file cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Log a warning, count the file as skipped and continue
    Skip,
    /// Fail the whole dataset build
    Abort,
}

impl Default for DecodeErrorPolicy {
    fn default() -> Self {
        Self::Skip
    }
}

/// Complete pipeline configuration
///
/// Every field has a default, so a JSON file only needs to name the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target sample rate in Hz; audio is resampled to this on load
    pub sample_rate: u32,
    /// Clip duration after length normalization
    pub duration_seconds: f32,
    /// MFCC coefficients per frame
    pub n_coefficients: usize,
    /// FFT size for feature extraction and the phase vocoder
    pub n_fft: usize,
    /// Hop between STFT frames
    pub hop_length: usize,
    /// Mel bands before the DCT
    pub n_mels: usize,

    /// Gaussian noise scale for noise injection
    pub noise_factor: f32,
    /// Maximum circular shift as a fraction of the clip length
    pub shift_max_fraction: f32,
    /// Pitch shift in semitones
    pub pitch_shift_steps: f32,
    /// Time-stretch rate for the speed change (>1 is faster)
    pub speed_rate: f32,

    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of examples held out for testing
    pub test_fraction: f32,
    /// Seed for augmentation, split and shuffling
    pub random_seed: u64,

    /// Class names in label-index order; empty means sorted directory names
    pub labels: Vec<String>,
    pub dataset_root: PathBuf,
    pub model_path: PathBuf,
    pub export_dir: PathBuf,
    pub decode_error_policy: DecodeErrorPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            duration_seconds: 1.0,
            n_coefficients: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            noise_factor: 0.02,
            shift_max_fraction: 0.2,
            pitch_shift_steps: 1.0,
            speed_rate: 1.1,
            epochs: 25,
            batch_size: 32,
            learning_rate: 1e-3,
            test_fraction: 0.2,
            random_seed: 42,
            labels: vec!["noise".to_string(), "breath".to_string()],
            dataset_root: PathBuf::from("dataset"),
            model_path: PathBuf::from("saved_model.safetensors"),
            export_dir: PathBuf::from("frontend/public/model"),
            decode_error_policy: DecodeErrorPolicy::Skip,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of samples in one length-normalized clip
    pub fn samples_per_clip(&self) -> usize {
        (self.sample_rate as f64 * self.duration_seconds as f64).round() as usize
    }

    /// Number of feature frames produced for one clip (centered STFT)
    pub fn frames_per_clip(&self) -> usize {
        1 + self.samples_per_clip() / self.hop_length
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return fail("sample_rate must be positive".into());
        }
        if !(self.duration_seconds > 0.0) {
            return fail(format!("duration_seconds must be positive, got {}", self.duration_seconds));
        }
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return fail(format!("n_fft must be even and >= 2, got {}", self.n_fft));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return fail(format!("hop_length must be in 1..={}, got {}", self.n_fft, self.hop_length));
        }
        if self.n_mels == 0 || self.n_coefficients == 0 || self.n_coefficients > self.n_mels {
            return fail(format!(
                "need 0 < n_coefficients ({}) <= n_mels ({})",
                self.n_coefficients, self.n_mels
            ));
        }
        if !(self.noise_factor >= 0.0) {
            return fail(format!("noise_factor must be >= 0, got {}", self.noise_factor));
        }
        if !(0.0..1.0).contains(&self.shift_max_fraction) {
            return fail(format!("shift_max_fraction must be in [0, 1), got {}", self.shift_max_fraction));
        }
        if !self.pitch_shift_steps.is_finite() {
            return fail("pitch_shift_steps must be finite".into());
        }
        if !(self.speed_rate > 0.0) || !self.speed_rate.is_finite() {
            return fail(format!("speed_rate must be positive, got {}", self.speed_rate));
        }
        if self.epochs == 0 || self.batch_size == 0 {
            return fail("epochs and batch_size must be positive".into());
        }
        if !(self.learning_rate > 0.0) {
            return fail(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return fail(format!("test_fraction must be in (0, 1), got {}", self.test_fraction));
        }

        let mut seen = std::collections::HashSet::new();
        for label in &self.labels {
            if label.is_empty() || !seen.insert(label.as_str()) {
                return fail(format!("labels must be non-empty and unique, got {:?}", self.labels));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.samples_per_clip(), 16_000);
        assert_eq!(config.frames_per_clip(), 32);
        assert_eq!(config.labels, vec!["noise", "breath"]);
        assert_eq!(config.random_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "epochs": 3, "decode_error_policy": "abort" }"#).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::Abort);
        assert_eq!(config.n_coefficients, 13);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.test_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.labels = vec!["noise".into(), "noise".into()];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.n_coefficients = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PipelineConfig::default();
        let json = config.to_json().unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
