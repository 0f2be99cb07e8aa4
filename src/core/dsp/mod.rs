//! Digital Signal Processing utilities

pub mod resample;
pub mod stats;
pub mod stft;
pub mod stretch;
pub mod windows;

pub use resample::resample;
pub use stft::{Spectrogram, Stft};
pub use stretch::{phase_vocoder, pitch_shift, time_stretch};

/// Truncate or right-pad with zeros to exactly `len` samples
pub fn fix_length(samples: &[f32], len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&samples[..samples.len().min(len)]);
    out.resize(len, 0.0);
    out
}
