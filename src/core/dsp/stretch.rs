//! Phase-vocoder time stretching and pitch shifting

use anyhow::Result;
use num_complex::Complex;
use std::f32::consts::PI;

use super::resample::resample;
use super::stft::{Spectrogram, Stft};
use super::fix_length;

/// Re-time an STFT by `rate` (>1 is faster) keeping the per-bin phase advance
pub fn phase_vocoder(frames: &[Vec<Complex<f32>>], rate: f32, hop: usize) -> Spectrogram {
    let n_frames = frames.len();
    if n_frames == 0 {
        return Vec::new();
    }

    let n_bins = frames[0].len();
    let n_fft = 2 * (n_bins - 1);

    // Expected phase advance per hop for each bin
    let phi_advance: Vec<f32> = (0..n_bins)
        .map(|k| 2.0 * PI * hop as f32 * k as f32 / n_fft as f32)
        .collect();

    let mut phase_acc: Vec<f32> = frames[0].iter().map(|c| c.arg()).collect();
    let zeros = vec![Complex::new(0.0f32, 0.0); n_bins];
    let column = |idx: usize| frames.get(idx).unwrap_or(&zeros);

    let n_out = (n_frames as f64 / rate as f64).ceil() as usize;
    let mut stretched = Vec::with_capacity(n_out);

    for t in 0..n_out {
        let step = t as f64 * rate as f64;
        if step >= n_frames as f64 {
            break;
        }
        let base = step.floor() as usize;
        let alpha = (step - base as f64) as f32;
        let (left, right) = (column(base), column(base + 1));

        let mut out_frame = Vec::with_capacity(n_bins);
        for k in 0..n_bins {
            let mag = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
            out_frame.push(Complex::from_polar(mag, phase_acc[k]));

            let mut dphase = right[k].arg() - left[k].arg() - phi_advance[k];
            dphase -= 2.0 * PI * (dphase / (2.0 * PI)).round();
            phase_acc[k] += phi_advance[k] + dphase;
        }
        stretched.push(out_frame);
    }

    stretched
}

/// Time-stretch a signal by `rate`; output has `round(len / rate)` samples
pub fn time_stretch(samples: &[f32], rate: f32, n_fft: usize, hop: usize) -> Vec<f32> {
    let target_len = (samples.len() as f64 / rate as f64).round() as usize;
    if samples.is_empty() {
        return Vec::new();
    }

    let stft = Stft::new(n_fft, hop);
    let frames = stft.forward(samples);
    let stretched = phase_vocoder(&frames, rate, hop);
    stft.inverse(&stretched, target_len)
}

/// Shift pitch by `n_steps` semitones without changing duration
///
/// Stretches by `2^(-n_steps/12)`, resamples back to the original rate and
/// fixes the length to the input length.
pub fn pitch_shift(
    samples: &[f32],
    sample_rate: u32,
    n_steps: f32,
    n_fft: usize,
    hop: usize,
) -> Result<Vec<f32>> {
    if samples.is_empty() || n_steps == 0.0 {
        return Ok(samples.to_vec());
    }

    let rate = 2.0f32.powf(-n_steps / 12.0);
    let stretched = time_stretch(samples, rate, n_fft, hop);
    let shifted = resample(
        &stretched,
        sample_rate as f64 / rate as f64,
        sample_rate as f64,
    )?;

    Ok(fix_length(&shifted, samples.len()))
}
