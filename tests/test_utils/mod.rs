// tests/test_utils/mod.rs
//
// Shared fixtures: WAV writers and dataset layouts built in temp directories.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use breathnet::PipelineConfig;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_breathnet"))
}

pub fn run_breathnet() -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.env_remove("BREATHNET_CONFIG");
    cmd
}

/// Write 16-bit PCM, interleaving `channels` copies of `samples`
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(v).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}

pub fn tone(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Deterministic broadband signal (LCG), roughly uniform in `[-amplitude, amplitude]`
pub fn hiss(len: usize, amplitude: f32, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            amplitude * ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0)
        })
        .collect()
}

/// Config suited to fast tests: few epochs, fixed seed
pub fn quick_config(root: &Path, epochs: usize) -> PipelineConfig {
    PipelineConfig {
        dataset_root: root.to_path_buf(),
        model_path: root.join("model.safetensors"),
        export_dir: root.join("web"),
        epochs,
        batch_size: 8,
        learning_rate: 5e-3,
        ..PipelineConfig::default()
    }
}

/// `noise/` with 3 silent clips and `breath/` with 2 silent clips
pub fn silent_dataset(root: &Path) {
    for i in 0..3 {
        write_wav(&root.join("noise").join(format!("n{}.wav", i)), &silence(16_000), 16_000, 1);
    }
    for i in 0..2 {
        write_wav(&root.join("breath").join(format!("b{}.wav", i)), &silence(16_000), 16_000, 1);
    }
}

/// Separable classes: low tones as noise, broadband hiss as breath
pub fn separable_dataset(root: &Path, per_class: usize) {
    for i in 0..per_class {
        let freq = 200.0 + 40.0 * i as f32;
        write_wav(
            &root.join("noise").join(format!("tone_{:02}.wav", i)),
            &tone(freq, 16_000, 16_000, 0.5),
            16_000,
            1,
        );
        write_wav(
            &root.join("breath").join(format!("hiss_{:02}.wav", i)),
            &hiss(16_000, 0.3, i as u32 + 1),
            16_000,
            1,
        );
    }
}
