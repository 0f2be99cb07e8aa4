//! Window function implementations

use std::f32::consts::PI;

/// Periodic Hann window (the DFT-even form used by STFT/ISTFT pairs)
pub fn hann_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos()))
        .collect()
}

/// Sum of squared, hop-shifted windows over `n_frames` frames
///
/// Used to undo the window gain after weighted overlap-add.
pub fn window_sum_square(window: &[f32], n_frames: usize, hop: usize) -> Vec<f32> {
    let n_fft = window.len();
    let total = n_fft + hop * n_frames.saturating_sub(1);
    let mut out = vec![0.0f32; total];

    for frame in 0..n_frames {
        let start = frame * hop;
        for (i, &w) in window.iter().enumerate() {
            out[start + i] += w * w;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(4);
        assert!((window[0]).abs() < 0.01);  // Should be ~0 at edges
        assert!((window[2] - 1.0).abs() < 0.01);  // Should be ~1 at center
    }

    #[test]
    fn test_window_sum_square_is_flat_at_quarter_hop() {
        let window = hann_window(64);
        let wss = window_sum_square(&window, 12, 16);
        // Interior region is covered by four overlapping frames: sum of hann^2 = 1.5
        for &v in &wss[64..wss.len() - 64] {
            assert!((v - 1.5).abs() < 1e-4, "got {}", v);
        }
    }
}
