// src/core/augment.rs
//
// Label-preserving waveform augmentation: noise, circular shift, pitch, speed.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::dsp::{pitch_shift, time_stretch};
use crate::config::PipelineConfig;

/// Which transform produced an augmented waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentationKind {
    Noise,
    TimeShift,
    PitchShift,
    SpeedChange,
}

impl AugmentationKind {
    /// Output order of [`Augmenter::augment`]
    pub fn all() -> [Self; 4] {
        [Self::Noise, Self::TimeShift, Self::PitchShift, Self::SpeedChange]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::TimeShift => "time_shift",
            Self::PitchShift => "pitch_shift",
            Self::SpeedChange => "speed_change",
        }
    }
}

/// One derived waveform; length may differ from the input for pitch and speed
#[derive(Debug, Clone)]
pub struct Augmented {
    pub kind: AugmentationKind,
    pub samples: Vec<f32>,
}

/// Augmentation parameters
#[derive(Debug, Clone)]
pub struct AugmentParams {
    pub sample_rate: u32,
    pub noise_factor: f32,
    pub shift_max_fraction: f32,
    pub pitch_shift_steps: f32,
    pub speed_rate: f32,
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for AugmentParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            noise_factor: config.noise_factor,
            shift_max_fraction: config.shift_max_fraction,
            pitch_shift_steps: config.pitch_shift_steps,
            speed_rate: config.speed_rate,
            n_fft: config.n_fft,
            hop_length: config.hop_length,
        }
    }
}

/// Add zero-mean unit-variance Gaussian noise scaled by `factor`
pub fn add_noise<R: Rng + ?Sized>(signal: &[f32], factor: f32, rng: &mut R) -> Vec<f32> {
    signal
        .iter()
        .map(|&s| {
            let n: f32 = rng.sample(StandardNormal);
            s + factor * n
        })
        .collect()
}

/// Circularly rotate by `shift` samples; positive moves samples to higher indices
pub fn roll(signal: &[f32], shift: isize) -> Vec<f32> {
    let len = signal.len();
    if len == 0 {
        return Vec::new();
    }

    let offset = shift.rem_euclid(len as isize) as usize;
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&signal[len - offset..]);
    out.extend_from_slice(&signal[..len - offset]);
    out
}

/// Random circular shift by up to `max_fraction` of the length in either direction
pub fn time_shift<R: Rng + ?Sized>(signal: &[f32], max_fraction: f32, rng: &mut R) -> Vec<f32> {
    let shift = random_shift(signal.len(), max_fraction, rng);
    roll(signal, shift)
}

fn random_shift<R: Rng + ?Sized>(len: usize, max_fraction: f32, rng: &mut R) -> isize {
    if max_fraction <= 0.0 || len == 0 {
        return 0;
    }
    let max = max_fraction as f64;
    let u: f64 = rng.gen_range(-max..max);
    // Truncates toward zero
    (u * len as f64) as isize
}

/// Produces the fixed four-variant augmentation set from one waveform
pub struct Augmenter {
    params: AugmentParams,
    rng: StdRng,
}

impl Augmenter {
    pub fn new(params: AugmentParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(AugmentParams::from(config), config.random_seed)
    }

    /// Restart the random stream
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn params(&self) -> &AugmentParams {
        &self.params
    }

    /// Noise, shift, pitch and speed variants, in that order
    ///
    /// The input is never modified. Pitch and speed variants may differ in
    /// length from the input; callers fix lengths before feature extraction.
    pub fn augment(&mut self, signal: &[f32]) -> Result<Vec<Augmented>> {
        let p = &self.params;

        let noisy = add_noise(signal, p.noise_factor, &mut self.rng);
        let shifted = time_shift(signal, p.shift_max_fraction, &mut self.rng);
        let pitched = pitch_shift(signal, p.sample_rate, p.pitch_shift_steps, p.n_fft, p.hop_length)?;
        let faster = time_stretch(signal, p.speed_rate, p.n_fft, p.hop_length);

        Ok(AugmentationKind::all()
            .into_iter()
            .zip([noisy, shifted, pitched, faster])
            .map(|(kind, samples)| Augmented { kind, samples })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32 - 0.5).collect()
    }

    #[test]
    fn test_roll_direction_and_wrap() {
        assert_eq!(roll(&[1.0, 2.0, 3.0, 4.0], 1), vec![4.0, 1.0, 2.0, 3.0]);
        assert_eq!(roll(&[1.0, 2.0, 3.0, 4.0], -1), vec![2.0, 3.0, 4.0, 1.0]);
        assert_eq!(roll(&[1.0, 2.0, 3.0], 3), vec![1.0, 2.0, 3.0]);
        assert!(roll(&[], 5).is_empty());
    }

    #[test]
    fn test_shift_bounded_by_fraction() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let s = random_shift(16_000, 0.2, &mut rng);
            assert!(s.abs() <= 3200);
        }
    }

    #[test]
    fn test_noise_statistics() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = add_noise(&vec![0.0; 50_000], 0.02, &mut rng);
        let mean = out.iter().sum::<f32>() / out.len() as f32;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 1e-3);
        assert!((var.sqrt() - 0.02).abs() < 1e-3);
    }

    #[test]
    fn test_augment_order_and_input_untouched() {
        let signal = ramp(16_000);
        let copy = signal.clone();
        let mut augmenter = Augmenter::new(AugmentParams::default(), 42);

        let variants = augmenter.augment(&signal).unwrap();
        assert_eq!(signal, copy);

        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, AugmentationKind::all().to_vec());
        assert_eq!(variants[0].samples.len(), 16_000);
        assert_eq!(variants[1].samples.len(), 16_000);
        assert_eq!(variants[2].samples.len(), 16_000);
        assert_eq!(variants[3].samples.len(), 14_545);
    }

    #[test]
    fn test_reseed_reproduces_random_variants() {
        let signal = ramp(4_000);
        let mut augmenter = Augmenter::new(AugmentParams::default(), 3);
        let first = augmenter.augment(&signal).unwrap();
        augmenter.reseed(3);
        let second = augmenter.augment(&signal).unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.samples, b.samples, "{} differs", a.kind.name());
        }
    }
}
