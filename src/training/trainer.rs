// src/training/trainer.rs
//
// Normalize -> split -> fit -> evaluate -> persist.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use chrono::Utc;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::artifact::{ModelArtifact, TensorF32};
use super::model::{BreathClassifier, ModelArchitecture};
use crate::config::PipelineConfig;
use crate::core::analysis::FeatureMatrix;
use crate::dataset::{labels_path_for, normalize_global, train_test_split, Dataset, LabelMap, Normalization};
use crate::error::PipelineError;

/// Metrics logged after each pass over the training partition
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub test_loss: f32,
    pub test_accuracy: f32,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: Vec<EpochMetrics>,
    pub train_size: usize,
    pub test_size: usize,
    /// Divisor used by global normalization
    pub feature_scale: f32,
    pub test_loss: f32,
    pub test_accuracy: f32,
}

/// A fitted classifier with everything needed to persist it
pub struct TrainedModel {
    varmap: VarMap,
    model: BreathClassifier,
    pub architecture: ModelArchitecture,
    pub label_map: LabelMap,
    pub report: TrainingReport,
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("architecture", &self.architecture)
            .field("label_map", &self.label_map)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl TrainedModel {
    /// Probability of label 1 for each raw (unnormalized) input matrix
    ///
    /// Inputs are divided by the training-set scale first.
    pub fn predict(&self, features: &[FeatureMatrix]) -> Result<Vec<f32>> {
        let shape = (self.architecture.input_frames, self.architecture.input_coefficients);
        let scale = self.report.feature_scale;
        let scaled: Vec<FeatureMatrix> = features
            .iter()
            .map(|f| FeatureMatrix::new(f.frames, f.coefficients, f.data.iter().map(|v| v / scale).collect()))
            .collect();
        let indices: Vec<usize> = (0..scaled.len()).collect();
        let xs = input_tensor(&scaled, &indices, shape, &Device::Cpu)?;
        let probs = candle_nn::ops::sigmoid(&self.model.forward(&xs)?)?;
        Ok(probs.flatten_all()?.to_vec1::<f32>()?)
    }

    pub fn to_artifact(&self) -> Result<ModelArtifact> {
        let vars = self
            .varmap
            .data()
            .lock()
            .map_err(|_| anyhow!("variable map lock poisoned"))?;

        let mut tensors = BTreeMap::new();
        for (name, var) in vars.iter() {
            let t = var.as_tensor();
            let data = t.flatten_all()?.to_vec1::<f32>()?;
            tensors.insert(name.clone(), TensorF32::new(t.dims().to_vec(), data));
        }

        Ok(ModelArtifact {
            architecture: self.architecture.clone(),
            label_map: self.label_map.clone(),
            tensors,
            test_accuracy: Some(self.report.test_accuracy),
            trained_at: Some(Utc::now()),
            feature_scale: Some(self.report.feature_scale),
        })
    }

    /// Write the artifact and its `<stem>.labels.json` companion
    pub fn save(&self, model_path: &Path) -> Result<()> {
        self.to_artifact()?.save(model_path)?;
        let labels_path = labels_path_for(model_path);
        self.label_map.save(&labels_path)?;
        info!("Saved model to {} and labels to {}", model_path.display(), labels_path.display());
        Ok(())
    }
}

#[derive(Debug)]
pub struct Trainer {
    config: PipelineConfig,
    device: Device,
}

impl Trainer {
    /// Fails with `InvalidConfig` unless `config` passes [`PipelineConfig::validate`]
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            device: Device::Cpu,
        })
    }

    /// Fit the classifier on `dataset`, evaluating on the held-out split after every epoch
    pub fn train(&self, mut dataset: Dataset) -> Result<TrainedModel> {
        dataset.validate_for_training()?;

        let feature_scale = match normalize_global(&mut dataset.features) {
            Normalization::Scaled { max_abs } => max_abs,
            Normalization::AllZero => {
                return Err(PipelineError::DegenerateDataset(
                    "every feature value is zero; nothing to learn".into(),
                )
                .into())
            }
        };

        let split = train_test_split(dataset.len(), self.config.test_fraction, self.config.random_seed);
        if split.train.is_empty() || split.test.is_empty() {
            return Err(PipelineError::DegenerateDataset(format!(
                "{} examples cannot be split into non-empty train and test sets",
                dataset.len()
            ))
            .into());
        }

        let shape = dataset.feature_shape().ok_or_else(|| anyhow!("empty dataset"))?;
        let architecture = ModelArchitecture::for_input(shape.0, shape.1);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let model = BreathClassifier::new(&architecture, vb)?;

        let mut optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        info!(
            "Training on {} examples, testing on {} ({} parameters, input {}x{})",
            split.train.len(),
            split.test.len(),
            architecture.parameter_count()?,
            shape.0,
            shape.1
        );

        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let mut train_order = split.train.clone();
        let mut epochs = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            train_order.shuffle(&mut rng);

            let mut loss_sum = 0.0f32;
            let mut correct = 0.0f32;
            for batch in train_order.chunks(self.config.batch_size) {
                let xs = input_tensor(&dataset.features, batch, shape, &self.device)?;
                let ys = target_tensor(&dataset.labels, batch, &self.device)?;

                let logits = model.forward(&xs)?;
                let loss = bce_with_logits(&logits, &ys)?;
                optimizer.backward_step(&loss)?;

                loss_sum += loss.to_scalar::<f32>()? * batch.len() as f32;
                correct += count_correct(&logits, &ys)?;
            }

            let n_train = train_order.len() as f32;
            let (test_loss, test_accuracy) = self.evaluate(&model, &dataset, &split.test, shape)?;
            let metrics = EpochMetrics {
                epoch,
                train_loss: loss_sum / n_train,
                train_accuracy: correct / n_train,
                test_loss,
                test_accuracy,
            };
            info!(
                "Epoch {}/{}: loss {:.4}, accuracy {:.4}, test_loss {:.4}, test_accuracy {:.4}",
                epoch,
                self.config.epochs,
                metrics.train_loss,
                metrics.train_accuracy,
                metrics.test_loss,
                metrics.test_accuracy
            );
            epochs.push(metrics);
        }

        let (test_loss, test_accuracy) = self.evaluate(&model, &dataset, &split.test, shape)?;
        info!("Test accuracy: {:.4}", test_accuracy);

        Ok(TrainedModel {
            varmap,
            model,
            architecture,
            label_map: dataset.label_map,
            report: TrainingReport {
                epochs,
                train_size: split.train.len(),
                test_size: split.test.len(),
                feature_scale,
                test_loss,
                test_accuracy,
            },
        })
    }

    /// Mean loss and accuracy over `indices`
    fn evaluate(
        &self,
        model: &BreathClassifier,
        dataset: &Dataset,
        indices: &[usize],
        shape: (usize, usize),
    ) -> Result<(f32, f32)> {
        let mut loss_sum = 0.0f32;
        let mut correct = 0.0f32;

        for batch in indices.chunks(self.config.batch_size) {
            let xs = input_tensor(&dataset.features, batch, shape, &self.device)?;
            let ys = target_tensor(&dataset.labels, batch, &self.device)?;
            let logits = model.forward(&xs)?;
            loss_sum += bce_with_logits(&logits, &ys)?.to_scalar::<f32>()? * batch.len() as f32;
            correct += count_correct(&logits, &ys)?;
        }

        let n = indices.len() as f32;
        Ok((loss_sum / n, correct / n))
    }
}

/// Gather `indices` into an `(N, 1, frames, coefficients)` tensor
fn input_tensor(
    features: &[FeatureMatrix],
    indices: &[usize],
    shape: (usize, usize),
    device: &Device,
) -> Result<Tensor> {
    let (frames, coeffs) = shape;
    let mut data = Vec::with_capacity(indices.len() * frames * coeffs);
    for &i in indices {
        let matrix = &features[i];
        if matrix.shape() != shape {
            return Err(PipelineError::ShapeMismatch {
                name: format!("features[{}]", i),
                expected: vec![frames, coeffs],
                actual: vec![matrix.frames, matrix.coefficients],
            }
            .into());
        }
        data.extend_from_slice(&matrix.data);
    }
    Ok(Tensor::from_vec(data, (indices.len(), 1, frames, coeffs), device)?)
}

fn target_tensor(labels: &[u32], indices: &[usize], device: &Device) -> Result<Tensor> {
    let data: Vec<f32> = indices.iter().map(|&i| labels[i] as f32).collect();
    Ok(Tensor::from_vec(data, (indices.len(), 1), device)?)
}

/// Mean binary cross-entropy on logits: `max(x, 0) - x*t + ln(1 + e^-|x|)`
fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let positive = logits.relu()?;
    let cross = (logits * targets)?;
    let soft = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    let loss = ((&positive - &cross)? + &soft)?;
    loss.mean_all()
}

/// Predictions are positive when the logit is non-negative (probability >= 0.5)
fn count_correct(logits: &Tensor, targets: &Tensor) -> candle_core::Result<f32> {
    let predictions = logits.ge(&logits.zeros_like()?)?.to_dtype(DType::F32)?;
    predictions
        .eq(targets)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()
}
