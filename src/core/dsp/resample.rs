//! Sample-rate conversion using rubato

use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample a mono signal from `from_rate` to `to_rate`
///
/// Rates are `f64` so the pitch shifter can resample from a fractional
/// virtual rate. The output is delay-compensated and has
/// `ceil(len * to_rate / from_rate)` samples.
pub fn resample(samples: &[f32], from_rate: f64, to_rate: f64) -> Result<Vec<f32>> {
    if samples.is_empty() || (from_rate - to_rate).abs() < f64::EPSILON {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate / from_rate;
    let expected_len = (samples.len() as f64 * to_rate / from_rate).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)?;
    let delay = resampler.output_delay();

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail until the delayed output covers the whole signal
    while output.len() < expected_len + delay {
        let tail = resampler.process_partial::<Vec<f32>>(None, None)?;
        match tail.into_iter().next() {
            Some(chunk) if !chunk.is_empty() => output.extend(chunk),
            _ => break,
        }
    }

    let mut out: Vec<f32> = output.into_iter().skip(delay).take(expected_len).collect();
    out.resize(expected_len, 0.0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000.0, 16_000.0).unwrap(), samples);
    }

    #[test]
    fn test_downsample_length() {
        let samples = vec![0.0f32; 48_000];
        let out = resample(&samples, 48_000.0, 16_000.0).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn test_upsample_preserves_tone_amplitude() {
        let samples: Vec<f32> = (0..8_000)
            .map(|i| (2.0 * PI * 200.0 * i as f32 / 8_000.0).sin() * 0.5)
            .collect();
        let out = resample(&samples, 8_000.0, 16_000.0).unwrap();
        assert_eq!(out.len(), 16_000);
        let peak = out[2000..14000].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
    }
}
