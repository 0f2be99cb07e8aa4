//! Short-time Fourier transform and its inverse

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::windows::{hann_window, window_sum_square};

/// Complex STFT, one `Vec` of `n_fft / 2 + 1` bins per frame
pub type Spectrogram = Vec<Vec<Complex<f32>>>;

/// Centered STFT/ISTFT pair with a periodic Hann window
///
/// Framing pads `n_fft / 2` zeros on both sides, so a signal of `n` samples
/// yields `1 + n / hop` frames.
pub struct Stft {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    n_fft: usize,
    hop: usize,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
            window: hann_window(n_fft),
            n_fft,
            hop,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Forward transform of a real signal
    pub fn forward(&self, samples: &[f32]) -> Spectrogram {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = (padded.len() - self.n_fft) / self.hop + 1;
        let mut frames = Vec::with_capacity(n_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for frame in 0..n_frames {
            let start = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..self.n_bins()].to_vec());
        }

        frames
    }

    /// Power spectrogram `|X|^2`, frames x bins
    pub fn power(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.forward(samples)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }

    /// Inverse transform by weighted overlap-add, trimmed or padded to `length`
    pub fn inverse(&self, frames: &[Vec<Complex<f32>>], length: usize) -> Vec<f32> {
        let n_frames = frames.len();
        if n_frames == 0 {
            return vec![0.0; length];
        }

        let total = self.n_fft + self.hop * (n_frames - 1);
        let mut signal = vec![0.0f32; total];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let half = self.n_fft / 2;
        let scale = 1.0 / self.n_fft as f32;

        for (frame_idx, frame) in frames.iter().enumerate() {
            // Rebuild the Hermitian-symmetric full spectrum
            for (k, slot) in buffer.iter_mut().enumerate() {
                *slot = if k <= half {
                    frame.get(k).copied().unwrap_or_default()
                } else {
                    frame.get(self.n_fft - k).map(|c| c.conj()).unwrap_or_default()
                };
            }
            buffer[0].im = 0.0;
            buffer[half].im = 0.0;

            self.inverse.process(&mut buffer);

            let start = frame_idx * self.hop;
            for (i, c) in buffer.iter().enumerate() {
                signal[start + i] += c.re * scale * self.window[i];
            }
        }

        let wss = window_sum_square(&self.window, n_frames, self.hop);
        for (s, &w) in signal.iter_mut().zip(wss.iter()) {
            if w > f32::MIN_POSITIVE {
                *s /= w;
            }
        }

        let mut out: Vec<f32> = signal.into_iter().skip(half).take(length).collect();
        out.resize(length, 0.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_frame_count_matches_centered_framing() {
        let stft = Stft::new(2048, 512);
        let frames = stft.forward(&vec![0.0; 16_000]);
        assert_eq!(frames.len(), 32);
        assert_eq!(frames.len(), stft.frame_count(16_000));
        assert_eq!(frames[0].len(), 1025);
    }

    #[test]
    fn test_inverse_reconstructs_signal() {
        let stft = Stft::new(256, 64);
        let signal: Vec<f32> = (0..2000)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 16_000.0).sin() * 0.5)
            .collect();

        let frames = stft.forward(&signal);
        let rebuilt = stft.inverse(&frames, signal.len());

        assert_eq!(rebuilt.len(), signal.len());
        for (a, b) in signal.iter().zip(rebuilt.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_sine_peak_bin() {
        let stft = Stft::new(1024, 256);
        let signal: Vec<f32> = (0..4096)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / 16_000.0).sin())
            .collect();
        let power = stft.power(&signal);
        let mid = &power[power.len() / 2];
        let peak = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz / (16000 / 1024) = bin 64
        assert_eq!(peak, 64);
    }
}
