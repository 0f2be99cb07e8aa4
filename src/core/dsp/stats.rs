//! Amplitude statistics

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak amplitude (maximum absolute value)
///
/// Non-finite values are ignored.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .map(|s| s.abs())
        .fold(0.0f32, f32::max)
}

/// Convert amplitude to dB (relative to 1.0)
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > 1e-10 {
        20.0 * amplitude.log10()
    } else {
        -200.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_and_peak() {
        let samples = [0.5, -1.0, 0.5, 0.0];
        assert!((peak_amplitude(&samples) - 1.0).abs() < 1e-6);
        assert!((rms(&samples) - (1.5f32 / 4.0).sqrt()).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(peak_amplitude(&[]), 0.0);
    }

    #[test]
    fn test_amplitude_to_db() {
        assert!((amplitude_to_db(1.0)).abs() < 1e-6);
        assert!((amplitude_to_db(0.1) + 20.0).abs() < 1e-4);
        assert_eq!(amplitude_to_db(0.0), -200.0);
    }
}
