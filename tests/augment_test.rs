// tests/augment_test.rs
//
// Augmentation behavior on one-second clips.
//
// Run with: cargo test --test augment_test

mod test_utils;

use breathnet::core::augment::{roll, AugmentationKind, Augmenter, AugmentParams};
use breathnet::core::dsp::fix_length;
use test_utils::{hiss, tone};

fn sorted(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

#[test]
fn test_fixed_variants_are_one_second() {
    let clip = tone(440.0, 16_000, 16_000, 0.5);
    let mut augmenter = Augmenter::new(AugmentParams::default(), 42);

    for v in augmenter.augment(&clip).unwrap() {
        let fixed = fix_length(&v.samples, 16_000);
        assert_eq!(fixed.len(), 16_000, "{}", v.kind.name());
        assert!(fixed.iter().all(|s| s.is_finite()));

        if v.kind == AugmentationKind::SpeedChange {
            // The faster clip ends early and is padded with silence
            assert!(v.samples.len() < 16_000);
            assert!(fixed[v.samples.len()..].iter().all(|&s| s == 0.0));
        }
    }
}

#[test]
fn test_noise_is_small_and_centered() {
    let clip = vec![0.0f32; 16_000];
    let mut augmenter = Augmenter::new(AugmentParams::default(), 3);
    let variants = augmenter.augment(&clip).unwrap();
    let noisy = &variants[0].samples;

    let n = noisy.len() as f32;
    let mean = noisy.iter().sum::<f32>() / n;
    let std = (noisy.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n).sqrt();
    assert!(mean.abs() < 0.002, "mean {}", mean);
    assert!((std - 0.02).abs() < 0.002, "std {}", std);
}

#[test]
fn test_time_shift_is_a_rotation() {
    let clip = hiss(16_000, 0.5, 9);
    let mut augmenter = Augmenter::new(AugmentParams::default(), 11);
    let shifted = augmenter.augment(&clip).unwrap().remove(1);
    assert_eq!(shifted.kind, AugmentationKind::TimeShift);

    assert_eq!(sorted(&shifted.samples), sorted(&clip));

    // A positive roll moves clip[0] to index `offset`; it must stay within 20% of the clip
    let offset = shifted.samples.iter().position(|&v| v == clip[0]).unwrap();
    assert_eq!(roll(&clip, offset as isize), shifted.samples);
    let signed = if offset > clip.len() / 2 {
        offset as isize - clip.len() as isize
    } else {
        offset as isize
    };
    assert!(signed.unsigned_abs() <= 3_200, "shift {}", signed);
}

#[test]
fn test_roll_inverse() {
    let clip = hiss(1_000, 1.0, 5);
    for s in [-700isize, -1, 0, 13, 999, 2_500] {
        assert_eq!(roll(&roll(&clip, s), -s), clip);
    }
}

#[test]
fn test_same_seed_same_variants() {
    let clip = tone(250.0, 16_000, 16_000, 0.3);
    let a = Augmenter::new(AugmentParams::default(), 7).augment(&clip).unwrap();
    let b = Augmenter::new(AugmentParams::default(), 7).augment(&clip).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.samples, y.samples);
    }
}
