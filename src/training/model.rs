// src/training/model.rs
//
// Two-block 2D CNN binary classifier over MFCC matrices.

use candle_core::{Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Layer sizes of the classifier; persisted in the artifact so it can be rebuilt or exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub input_frames: usize,
    pub input_coefficients: usize,
    pub conv_filters: Vec<usize>,
    pub kernel_size: usize,
    pub pool_size: usize,
    pub dense_units: usize,
}

impl ModelArchitecture {
    /// Conv(16) -> pool -> Conv(32) -> pool -> Dense(64) -> Dense(1)
    pub fn for_input(frames: usize, coefficients: usize) -> Self {
        Self {
            input_frames: frames,
            input_coefficients: coefficients,
            conv_filters: vec![16, 32],
            kernel_size: 3,
            pool_size: 2,
            dense_units: 64,
        }
    }

    /// Spatial size after each conv+pool block: (height, width) per block
    pub fn block_shapes(&self) -> Result<Vec<(usize, usize)>, PipelineError> {
        let mut h = self.input_frames;
        let mut w = self.input_coefficients;
        let mut shapes = Vec::with_capacity(self.conv_filters.len());

        for (i, _) in self.conv_filters.iter().enumerate() {
            if h < self.kernel_size || w < self.kernel_size {
                return Err(PipelineError::InvalidConfig(format!(
                    "input {}x{} too small for conv block {}",
                    self.input_frames, self.input_coefficients, i + 1
                )));
            }
            h = (h - self.kernel_size + 1) / self.pool_size;
            w = (w - self.kernel_size + 1) / self.pool_size;
            if h == 0 || w == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "input {}x{} pools away to nothing in block {}",
                    self.input_frames, self.input_coefficients, i + 1
                )));
            }
            shapes.push((h, w));
        }

        Ok(shapes)
    }

    /// Channels, height and width entering the flatten layer
    pub fn conv_output_shape(&self) -> Result<(usize, usize, usize), PipelineError> {
        let (h, w) = *self
            .block_shapes()?
            .last()
            .ok_or_else(|| PipelineError::InvalidConfig("no conv blocks".into()))?;
        let channels = *self.conv_filters.last().unwrap_or(&1);
        Ok((channels, h, w))
    }

    pub fn flattened_size(&self) -> Result<usize, PipelineError> {
        let (c, h, w) = self.conv_output_shape()?;
        Ok(c * h * w)
    }

    /// Expected parameter names and shapes (channels-first conv kernels, `(out, in)` dense)
    pub fn parameter_shapes(&self) -> Result<Vec<(String, Vec<usize>)>, PipelineError> {
        let k = self.kernel_size;
        let mut shapes = Vec::new();
        let mut in_channels = 1;

        for (i, &filters) in self.conv_filters.iter().enumerate() {
            let name = format!("conv{}", i + 1);
            shapes.push((format!("{}.weight", name), vec![filters, in_channels, k, k]));
            shapes.push((format!("{}.bias", name), vec![filters]));
            in_channels = filters;
        }

        let flat = self.flattened_size()?;
        shapes.push(("fc1.weight".into(), vec![self.dense_units, flat]));
        shapes.push(("fc1.bias".into(), vec![self.dense_units]));
        shapes.push(("fc2.weight".into(), vec![1, self.dense_units]));
        shapes.push(("fc2.bias".into(), vec![1]));
        Ok(shapes)
    }

    pub fn parameter_count(&self) -> Result<usize, PipelineError> {
        Ok(self
            .parameter_shapes()?
            .iter()
            .map(|(_, s)| s.iter().product::<usize>())
            .sum())
    }
}

/// Candle implementation; `forward` returns one logit per example, shape `(N, 1)`
pub struct BreathClassifier {
    convs: Vec<Conv2d>,
    fc1: Linear,
    fc2: Linear,
    pool_size: usize,
}

impl BreathClassifier {
    pub fn new(arch: &ModelArchitecture, vb: VarBuilder) -> anyhow::Result<Self> {
        let flat = arch.flattened_size()?;
        let mut convs = Vec::with_capacity(arch.conv_filters.len());
        let mut in_channels = 1;

        for (i, &filters) in arch.conv_filters.iter().enumerate() {
            let conv = conv2d(
                in_channels,
                filters,
                arch.kernel_size,
                Conv2dConfig::default(),
                vb.pp(format!("conv{}", i + 1)),
            )?;
            convs.push(conv);
            in_channels = filters;
        }

        Ok(Self {
            convs,
            fc1: linear(flat, arch.dense_units, vb.pp("fc1"))?,
            fc2: linear(arch.dense_units, 1, vb.pp("fc2"))?,
            pool_size: arch.pool_size,
        })
    }
}

impl Module for BreathClassifier {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = xs.clone();
        for conv in &self.convs {
            x = conv.forward(&x)?.relu()?.max_pool2d(self.pool_size)?;
        }
        let x = x.flatten_from(1)?;
        let x = self.fc1.forward(&x)?.relu()?;
        self.fc2.forward(&x)
    }
}
