//! Configuration module for breathnet

mod pipeline;

pub use pipeline::{DecodeErrorPolicy, PipelineConfig};
