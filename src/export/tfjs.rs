// src/export/tfjs.rs
//
// TensorFlow.js layers-model writer: model.json (Keras topology + weights
// manifest) and a single binary weight shard.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::training::{ModelArchitecture, ModelArtifact, TensorF32};

pub const MODEL_JSON: &str = "model.json";
pub const WEIGHTS_SHARD: &str = "group1-shard1of1.bin";
pub const LABELS_JSON: &str = "labels.json";
pub const PREPROCESSING_JSON: &str = "preprocessing.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsGroup {
    pub paths: Vec<String>,
    pub weights: Vec<WeightEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayersModelJson {
    pub format: String,
    pub generated_by: String,
    pub converted_by: String,
    pub model_topology: Value,
    pub weights_manifest: Vec<WeightsGroup>,
}

/// Input scaling the browser applies before `model.predict`: `mfcc / feature_scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    pub feature_scale: f32,
}

/// What was written by [`export_tfjs`]
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub weight_count: usize,
    pub weight_bytes: usize,
}

/// One converted weight, channels-last, in manifest order
struct KerasWeight {
    entry: WeightEntry,
    values: Vec<f32>,
}

/// `(out, in, kh, kw)` -> `(kh, kw, in, out)`
pub fn conv_kernel_to_keras(t: &TensorF32) -> (Vec<usize>, Vec<f32>) {
    let (o_n, i_n, kh, kw) = (t.shape[0], t.shape[1], t.shape[2], t.shape[3]);
    let mut out = vec![0.0f32; t.data.len()];

    for co in 0..o_n {
        for ci in 0..i_n {
            for y in 0..kh {
                for x in 0..kw {
                    let src = ((co * i_n + ci) * kh + y) * kw + x;
                    let dst = ((y * kw + x) * i_n + ci) * o_n + co;
                    out[dst] = t.data[src];
                }
            }
        }
    }

    (vec![kh, kw, i_n, o_n], out)
}

/// `(out, in)` -> `(in, out)`
///
/// With `flatten_from = Some((c, h, w))` the input dimension is also
/// reordered from channels-first flatten order to channels-last.
pub fn dense_kernel_to_keras(t: &TensorF32, flatten_from: Option<(usize, usize, usize)>) -> (Vec<usize>, Vec<f32>) {
    let (o_n, in_n) = (t.shape[0], t.shape[1]);
    let mut out = vec![0.0f32; t.data.len()];

    let row_for = |j_cf: usize| match flatten_from {
        Some((c_n, h, w)) => {
            let spatial = h * w;
            (j_cf % spatial) * c_n + j_cf / spatial
        }
        None => j_cf,
    };

    for o in 0..o_n {
        for j in 0..in_n {
            out[row_for(j) * o_n + o] = t.data[o * in_n + j];
        }
    }

    (vec![in_n, o_n], out)
}

fn keras_weights(artifact: &ModelArtifact) -> Result<Vec<KerasWeight>> {
    let arch = &artifact.architecture;
    let mut weights = Vec::new();
    let mut push = |name: String, shape: Vec<usize>, values: Vec<f32>| {
        weights.push(KerasWeight {
            entry: WeightEntry {
                name,
                shape,
                dtype: "float32".to_string(),
            },
            values,
        });
    };

    for i in 0..arch.conv_filters.len() {
        let layer = keras_name("conv2d", i);
        let (shape, values) = conv_kernel_to_keras(artifact.tensor(&format!("conv{}.weight", i + 1))?);
        push(format!("{}/kernel", layer), shape, values);
        let bias = artifact.tensor(&format!("conv{}.bias", i + 1))?;
        push(format!("{}/bias", layer), bias.shape.clone(), bias.data.clone());
    }

    let flatten = arch.conv_output_shape()?;
    for (i, (prefix, reorder)) in [("fc1", Some(flatten)), ("fc2", None)].into_iter().enumerate() {
        let layer = keras_name("dense", i);
        let (shape, values) = dense_kernel_to_keras(artifact.tensor(&format!("{}.weight", prefix))?, reorder);
        push(format!("{}/kernel", layer), shape, values);
        let bias = artifact.tensor(&format!("{}.bias", prefix))?;
        push(format!("{}/bias", layer), bias.shape.clone(), bias.data.clone());
    }

    Ok(weights)
}

/// Keras auto-naming: `dense`, `dense_1`, ...
fn keras_name(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, index)
    }
}

fn initializer(class_name: &str) -> Value {
    json!({ "class_name": class_name, "config": { "seed": null } })
}

/// Keras `Sequential` topology equivalent to the candle classifier
pub fn model_topology(arch: &ModelArchitecture) -> Value {
    let k = arch.kernel_size;
    let p = arch.pool_size;
    let mut layers = Vec::new();

    for (i, &filters) in arch.conv_filters.iter().enumerate() {
        let mut config = json!({
            "name": keras_name("conv2d", i),
            "trainable": true,
            "dtype": "float32",
            "filters": filters,
            "kernel_size": [k, k],
            "strides": [1, 1],
            "padding": "valid",
            "data_format": "channels_last",
            "dilation_rate": [1, 1],
            "groups": 1,
            "activation": "relu",
            "use_bias": true,
            "kernel_initializer": initializer("GlorotUniform"),
            "bias_initializer": { "class_name": "Zeros", "config": {} },
            "kernel_regularizer": null,
            "bias_regularizer": null,
            "activity_regularizer": null,
            "kernel_constraint": null,
            "bias_constraint": null
        });
        if i == 0 {
            config["batch_input_shape"] = json!([null, arch.input_frames, arch.input_coefficients, 1]);
        }
        layers.push(json!({ "class_name": "Conv2D", "config": config }));

        layers.push(json!({
            "class_name": "MaxPooling2D",
            "config": {
                "name": keras_name("max_pooling2d", i),
                "trainable": true,
                "dtype": "float32",
                "pool_size": [p, p],
                "padding": "valid",
                "strides": [p, p],
                "data_format": "channels_last"
            }
        }));
    }

    layers.push(json!({
        "class_name": "Flatten",
        "config": { "name": "flatten", "trainable": true, "dtype": "float32", "data_format": "channels_last" }
    }));

    for (i, (units, activation)) in [(arch.dense_units, "relu"), (1, "sigmoid")].into_iter().enumerate() {
        layers.push(json!({
            "class_name": "Dense",
            "config": {
                "name": keras_name("dense", i),
                "trainable": true,
                "dtype": "float32",
                "units": units,
                "activation": activation,
                "use_bias": true,
                "kernel_initializer": initializer("GlorotUniform"),
                "bias_initializer": { "class_name": "Zeros", "config": {} },
                "kernel_regularizer": null,
                "bias_regularizer": null,
                "activity_regularizer": null,
                "kernel_constraint": null,
                "bias_constraint": null
            }
        }));
    }

    json!({
        "class_name": "Sequential",
        "config": { "name": "sequential", "layers": layers },
        "keras_version": "2.15.0",
        "backend": "tensorflow"
    })
}

/// Write the TF.js bundle for `artifact` into `output_dir`
pub fn export_tfjs(artifact: &ModelArtifact, output_dir: &Path) -> Result<ExportSummary> {
    artifact.validate()?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create export directory: {}", output_dir.display()))?;

    let weights = keras_weights(artifact)?;
    let mut shard = Vec::new();
    for w in &weights {
        debug!("{} {:?}", w.entry.name, w.entry.shape);
        shard.extend(w.values.iter().flat_map(|v| v.to_le_bytes()));
    }
    let weight_count: usize = weights.iter().map(|w| w.values.len()).sum();

    let generated_by = format!("breathnet {}", env!("CARGO_PKG_VERSION"));
    let model_json = LayersModelJson {
        format: "layers-model".to_string(),
        generated_by: generated_by.clone(),
        converted_by: generated_by,
        model_topology: model_topology(&artifact.architecture),
        weights_manifest: vec![WeightsGroup {
            paths: vec![WEIGHTS_SHARD.to_string()],
            weights: weights.into_iter().map(|w| w.entry).collect(),
        }],
    };

    let model_path = output_dir.join(MODEL_JSON);
    let shard_path = output_dir.join(WEIGHTS_SHARD);
    let labels_path = output_dir.join(LABELS_JSON);

    std::fs::write(&model_path, serde_json::to_string_pretty(&model_json)?)
        .with_context(|| format!("Failed to write {}", model_path.display()))?;
    std::fs::write(&shard_path, &shard)
        .with_context(|| format!("Failed to write {}", shard_path.display()))?;
    artifact.label_map.save(&labels_path)?;

    let mut files = vec![model_path, shard_path, labels_path];
    match artifact.feature_scale {
        Some(feature_scale) => {
            let path = output_dir.join(PREPROCESSING_JSON);
            std::fs::write(&path, serde_json::to_string_pretty(&Preprocessing { feature_scale })?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            files.push(path);
        }
        None => warn!("Artifact has no feature scale; {} not written", PREPROCESSING_JSON),
    }

    info!(
        "Exported {} weights ({} bytes) to {}",
        weight_count,
        shard.len(),
        output_dir.display()
    );

    Ok(ExportSummary {
        output_dir: output_dir.to_path_buf(),
        files,
        weight_count,
        weight_bytes: shard.len(),
    })
}
