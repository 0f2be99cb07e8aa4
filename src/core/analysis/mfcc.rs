// src/core/analysis/mfcc.rs
//
// MFCC extraction: power mel spectrogram -> dB (80 dB floor) -> orthonormal DCT-II

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::mel::mel_filterbank;
use crate::config::PipelineConfig;
use crate::core::dsp::Stft;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// MFCC analysis parameters
#[derive(Debug, Clone)]
pub struct MfccParams {
    pub sample_rate: u32,
    pub num_coefficients: usize,
    pub num_mel_bands: usize,
    pub fft_size: usize,
    pub hop_size: usize,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            num_coefficients: 13,
            num_mel_bands: 128,
            fft_size: 2048,
            hop_size: 512,
        }
    }
}

impl From<&PipelineConfig> for MfccParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            num_coefficients: config.n_coefficients,
            num_mel_bands: config.n_mels,
            fft_size: config.n_fft,
            hop_size: config.hop_length,
        }
    }
}

/// Row-major `frames x coefficients` feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub frames: usize,
    pub coefficients: usize,
    pub data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(frames: usize, coefficients: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), frames * coefficients);
        Self { frames, coefficients, data }
    }

    pub fn zeros(frames: usize, coefficients: usize) -> Self {
        Self::new(frames, coefficients, vec![0.0; frames * coefficients])
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.coefficients)
    }

    pub fn get(&self, frame: usize, coefficient: usize) -> f32 {
        self.data[frame * self.coefficients + coefficient]
    }

    pub fn frame(&self, frame: usize) -> &[f32] {
        let start = frame * self.coefficients;
        &self.data[start..start + self.coefficients]
    }

    pub fn max_abs(&self) -> f32 {
        crate::core::dsp::stats::peak_amplitude(&self.data)
    }
}

/// MFCC extractor with a precomputed filterbank and DCT basis
pub struct MfccExtractor {
    params: MfccParams,
    stft: Stft,
    filterbank: Vec<Vec<f32>>,
    dct_basis: Vec<Vec<f32>>,
}

impl MfccExtractor {
    pub fn new(params: MfccParams) -> Self {
        let stft = Stft::new(params.fft_size, params.hop_size);
        let filterbank = mel_filterbank(
            params.sample_rate,
            params.fft_size,
            params.num_mel_bands,
            0.0,
            params.sample_rate as f32 / 2.0,
        );
        let dct_basis = dct_ortho_basis(params.num_coefficients, params.num_mel_bands);
        Self { params, stft, filterbank, dct_basis }
    }

    pub fn params(&self) -> &MfccParams {
        &self.params
    }

    /// Frames produced for a clip of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        self.stft.frame_count(len)
    }

    /// Compute the MFCC feature matrix of a mono signal
    pub fn extract(&self, samples: &[f32]) -> FeatureMatrix {
        let power = self.stft.power(samples);
        let n_frames = power.len();
        let n_mels = self.params.num_mel_bands;

        let mut mel_db = Vec::with_capacity(n_frames * n_mels);
        for frame in &power {
            for filter in &self.filterbank {
                let energy: f32 = filter.iter().zip(frame.iter()).map(|(w, p)| w * p).sum();
                mel_db.push(10.0 * energy.max(AMIN).log10());
            }
        }

        // Clamp to TOP_DB below the global peak of the whole clip
        let peak = mel_db.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - TOP_DB;
        for v in mel_db.iter_mut() {
            *v = v.max(floor);
        }

        let n_coeff = self.params.num_coefficients;
        let mut data = Vec::with_capacity(n_frames * n_coeff);
        for frame in mel_db.chunks_exact(n_mels) {
            for basis in &self.dct_basis {
                data.push(basis.iter().zip(frame.iter()).map(|(b, x)| b * x).sum());
            }
        }

        FeatureMatrix::new(n_frames, n_coeff, data)
    }
}

/// Orthonormal DCT-II basis rows for the first `n_out` coefficients of `n_in` inputs
fn dct_ortho_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f32;
    (0..n_out)
        .map(|k| {
            let norm = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| norm * (PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

/// Analyze MFCC features with the given parameters
pub fn analyze_mfcc(samples: &[f32], params: &MfccParams) -> FeatureMatrix {
    MfccExtractor::new(params.clone()).extract(samples)
}
