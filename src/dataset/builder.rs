// src/dataset/builder.rs
//
// Walks class folders, normalizes clip length, extracts MFCCs for each clip
// and its four augmented variants.
//
// Every feature matrix is kept in memory until training starts, so peak
// memory grows linearly with the number of source files.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::labels::LabelMap;
use super::{ClassSummary, Dataset, DatasetSummary};
use crate::config::{DecodeErrorPolicy, PipelineConfig};
use crate::core::analysis::{FeatureMatrix, MfccExtractor, MfccParams};
use crate::core::augment::Augmenter;
use crate::core::decoder::{is_audio_file, load_waveform};
use crate::core::dsp::{fix_length, stats};
use crate::error::PipelineError;

/// Labeled examples contributed by every source file (original + 4 variants)
pub const EXAMPLES_PER_FILE: usize = 5;

pub struct DatasetBuilder {
    config: PipelineConfig,
    extractor: MfccExtractor,
    augmenter: Augmenter,
    show_progress: bool,
}

impl DatasetBuilder {
    /// Fails with `InvalidConfig` unless `config` passes [`PipelineConfig::validate`]
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            extractor: MfccExtractor::new(MfccParams::from(config)),
            augmenter: Augmenter::from_config(config),
            show_progress: false,
        })
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Feature matrices for one waveform: the original first, then each augmented variant
    pub fn examples_from_waveform(&mut self, waveform: &[f32]) -> Result<Vec<FeatureMatrix>> {
        let target = self.config.samples_per_clip();
        let clip = fix_length(waveform, target);

        let mut examples = Vec::with_capacity(EXAMPLES_PER_FILE);
        examples.push(self.extractor.extract(&clip));

        for variant in self.augmenter.augment(&clip)? {
            let fixed = fix_length(&variant.samples, target);
            examples.push(self.extractor.extract(&fixed));
        }

        Ok(examples)
    }

    /// Build the dataset from `root/<class>/**/<audio files>`
    pub fn build(&mut self, root: &Path) -> Result<Dataset> {
        let label_map = LabelMap::resolve(&self.config.labels, root)?;
        info!("Building dataset from {} with classes {:?}", root.display(), label_map.classes);

        let mut class_files = Vec::with_capacity(label_map.len());
        for (_, class) in label_map.iter() {
            let dir = root.join(class);
            if !dir.is_dir() {
                return Err(PipelineError::MissingClassDir(dir).into());
            }
            class_files.push(collect_audio_files(&dir));
        }

        let total: usize = class_files.iter().map(Vec::len).sum();
        let progress = self.progress_bar(total as u64)?;

        let mut dataset = Dataset::new(label_map.clone());
        let mut skipped = Vec::new();
        let mut classes = Vec::with_capacity(label_map.len());

        for ((label, class), files) in label_map.iter().zip(class_files) {
            let mut used = 0usize;
            let mut examples = 0usize;

            for path in files {
                progress.set_message(format!("{}/{}", class, file_name(&path)));

                match load_waveform(&path, self.config.sample_rate) {
                    Ok(waveform) => {
                        debug!(
                            "{}: {} samples, rms {:.1} dB",
                            path.display(),
                            waveform.len(),
                            stats::amplitude_to_db(stats::rms(&waveform))
                        );
                        for features in self.examples_from_waveform(&waveform)? {
                            dataset.push(features, label);
                            examples += 1;
                        }
                        used += 1;
                    }
                    Err(e) => match self.config.decode_error_policy {
                        DecodeErrorPolicy::Skip => {
                            warn!("Skipping {}: {:#}", path.display(), e);
                            skipped.push(path);
                        }
                        DecodeErrorPolicy::Abort => {
                            progress.abandon();
                            return Err(PipelineError::Decode {
                                path,
                                reason: format!("{:#}", e),
                            }
                            .into());
                        }
                    },
                }

                progress.inc(1);
            }

            if used == 0 {
                warn!("Class '{}' contributed no examples", class);
            }
            info!("Class '{}' (label {}): {} files, {} examples", class, label, used, examples);

            classes.push(ClassSummary {
                name: class.to_string(),
                label,
                files: used,
                examples,
            });
        }

        progress.finish_and_clear();
        dataset.summary = DatasetSummary { classes, skipped };
        Ok(dataset)
    }

    fn progress_bar(&self, total: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        Ok(bar)
    }
}

/// Audio files below `dir`, sorted by file name
fn collect_audio_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
