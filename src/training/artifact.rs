// src/training/artifact.rs
//
// Trained model artifact: safetensors weights plus architecture, label map
// and training metadata in the safetensors header.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use safetensors::tensor::{Dtype, View};
use safetensors::SafeTensors;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::model::ModelArchitecture;
use crate::dataset::LabelMap;
use crate::error::PipelineError;

pub const ARTIFACT_FORMAT: &str = "breathnet-cnn-v1";

const KEY_FORMAT: &str = "format";
const KEY_ARCHITECTURE: &str = "architecture";
const KEY_LABELS: &str = "labels";
const KEY_TEST_ACCURACY: &str = "test_accuracy";
const KEY_TRAINED_AT: &str = "trained_at";
const KEY_FEATURE_SCALE: &str = "feature_scale";

/// Dense f32 tensor in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct TensorF32 {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorF32 {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

/// Little-endian byte view handed to the safetensors serializer
struct RawTensor {
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl From<&TensorF32> for RawTensor {
    fn from(t: &TensorF32) -> Self {
        Self {
            shape: t.shape.clone(),
            bytes: t.data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }
}

impl View for RawTensor {
    fn dtype(&self) -> Dtype {
        Dtype::F32
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.bytes)
    }

    fn data_len(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub architecture: ModelArchitecture,
    pub label_map: LabelMap,
    pub tensors: BTreeMap<String, TensorF32>,
    pub test_accuracy: Option<f32>,
    pub trained_at: Option<DateTime<Utc>>,
    /// Divisor applied to raw MFCCs before training
    pub feature_scale: Option<f32>,
}

impl ModelArtifact {
    pub fn tensor(&self, name: &str) -> Result<&TensorF32, PipelineError> {
        self.tensors
            .get(name)
            .ok_or_else(|| PipelineError::InvalidArtifact(format!("missing tensor '{}'", name)))
    }

    /// Check every expected parameter is present with the right shape and length
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, expected) in self.architecture.parameter_shapes()? {
            let tensor = self.tensor(&name)?;
            if tensor.shape != expected {
                return Err(PipelineError::ShapeMismatch {
                    name,
                    expected,
                    actual: tensor.shape.clone(),
                });
            }
            let len: usize = expected.iter().product();
            if tensor.data.len() != len {
                return Err(PipelineError::InvalidArtifact(format!(
                    "tensor '{}' has {} values, expected {}",
                    name,
                    tensor.data.len(),
                    len
                )));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let mut info = HashMap::new();
        info.insert(KEY_FORMAT.to_string(), ARTIFACT_FORMAT.to_string());
        info.insert(KEY_ARCHITECTURE.to_string(), serde_json::to_string(&self.architecture)?);
        info.insert(KEY_LABELS.to_string(), serde_json::to_string(&self.label_map)?);
        if let Some(acc) = self.test_accuracy {
            info.insert(KEY_TEST_ACCURACY.to_string(), acc.to_string());
        }
        if let Some(scale) = self.feature_scale {
            info.insert(KEY_FEATURE_SCALE.to_string(), scale.to_string());
        }
        if let Some(ts) = self.trained_at {
            info.insert(KEY_TRAINED_AT.to_string(), ts.to_rfc3339());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let raw: Vec<(String, RawTensor)> = self
            .tensors
            .iter()
            .map(|(name, t)| (name.clone(), RawTensor::from(t)))
            .collect();

        safetensors::tensor::serialize_to_file(raw, &Some(info), path)
            .with_context(|| format!("Failed to write model artifact: {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;

        let (_, metadata) = SafeTensors::read_metadata(&bytes)
            .context("Failed to parse safetensors header")?;
        let info = metadata.metadata().clone().unwrap_or_default();
        let field = |key: &str| {
            info.get(key)
                .ok_or_else(|| PipelineError::InvalidArtifact(format!("missing metadata '{}'", key)))
        };

        let format = field(KEY_FORMAT)?;
        if format != ARTIFACT_FORMAT {
            return Err(PipelineError::InvalidArtifact(format!("unsupported format '{}'", format)).into());
        }

        let architecture: ModelArchitecture = serde_json::from_str(field(KEY_ARCHITECTURE)?)
            .context("Invalid architecture metadata")?;
        let label_map: LabelMap = serde_json::from_str(field(KEY_LABELS)?)
            .context("Invalid label metadata")?;
        let test_accuracy = info.get(KEY_TEST_ACCURACY).and_then(|s| s.parse().ok());
        let feature_scale = info.get(KEY_FEATURE_SCALE).and_then(|s| s.parse().ok());
        let trained_at = info
            .get(KEY_TRAINED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let st = SafeTensors::deserialize(&bytes).context("Failed to parse safetensors data")?;
        let mut tensors = BTreeMap::new();
        for (name, view) in st.iter() {
            if view.dtype() != Dtype::F32 {
                return Err(PipelineError::InvalidArtifact(format!(
                    "tensor '{}' has dtype {:?}, expected F32",
                    name,
                    view.dtype()
                ))
                .into());
            }
            let data = view
                .data()
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            tensors.insert(name.to_string(), TensorF32::new(view.shape().to_vec(), data));
        }

        let artifact = Self {
            architecture,
            label_map,
            tensors,
            test_accuracy,
            trained_at,
            feature_scale,
        };
        artifact.validate()?;
        Ok(artifact)
    }
}
