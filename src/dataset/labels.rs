// src/dataset/labels.rs
//
// Explicit class-name <-> label-index mapping, persisted next to the model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::PipelineError;

/// Ordered class names; a name's position is its label index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    pub classes: Vec<String>,
}

impl LabelMap {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Use `configured` if non-empty, otherwise the sorted subdirectory names of `root`
    pub fn resolve(configured: &[String], root: &Path) -> Result<Self, PipelineError> {
        if !configured.is_empty() {
            return Ok(Self::new(configured.to_vec()));
        }

        let classes: Vec<String> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();

        if classes.is_empty() {
            return Err(PipelineError::NoClasses(root.to_path_buf()));
        }
        Ok(Self::new(classes))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.classes.iter().position(|c| c == name).map(|i| i as u32)
    }

    pub fn name_of(&self, index: u32) -> Option<&str> {
        self.classes.get(index as usize).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.classes.iter().enumerate().map(|(i, c)| (i as u32, c.as_str()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write label map: {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label map: {}", path.display()))?;
        Self::from_json(&text)
    }
}

/// `<dir>/<stem>.labels.json` for a model at `<dir>/<stem>.<ext>`
pub fn labels_path_for(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    model_path.with_file_name(format!("{}.labels.json", stem))
}
