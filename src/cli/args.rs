//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "breathnet")]
#[command(version, about = "Build an augmented breath/noise dataset, train a CNN and export it for the browser")]
pub struct Args {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long, global = true, env = "BREATHNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the augmented dataset and print per-class counts
    Dataset {
        /// Dataset root with one subdirectory per class
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// Build the dataset, train the classifier and save the model
    Train {
        /// Dataset root with one subdirectory per class
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Output model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Number of passes over the training split
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Seed for augmentation, split and shuffling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Convert a trained model to a TensorFlow.js layers model
    Export {
        /// Trained model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output directory for model.json and weight shards
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config,
}

impl Command {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        match self {
            Command::Dataset { dataset } => {
                if let Some(d) = dataset {
                    config.dataset_root = d.clone();
                }
            }
            Command::Train { dataset, model, epochs, seed } => {
                if let Some(d) = dataset {
                    config.dataset_root = d.clone();
                }
                if let Some(m) = model {
                    config.model_path = m.clone();
                }
                if let Some(e) = epochs {
                    config.epochs = *e;
                }
                if let Some(s) = seed {
                    config.random_seed = *s;
                }
            }
            Command::Export { model, output } => {
                if let Some(m) = model {
                    config.model_path = m.clone();
                }
                if let Some(o) = output {
                    config.export_dir = o.clone();
                }
            }
            Command::Config => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_overrides() {
        let args = Args::try_parse_from([
            "breathnet", "train", "--dataset", "data", "--epochs", "3", "--seed", "7",
        ])
        .unwrap();

        let mut config = PipelineConfig::default();
        args.command.apply_overrides(&mut config);
        assert_eq!(config.dataset_root, PathBuf::from("data"));
        assert_eq!(config.epochs, 3);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.model_path, PathBuf::from("saved_model.safetensors"));
    }

    #[test]
    fn test_parse_export_with_global_flags() {
        let args = Args::try_parse_from([
            "breathnet", "export", "-m", "m.safetensors", "-o", "web/model", "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);

        let mut config = PipelineConfig::default();
        args.command.apply_overrides(&mut config);
        assert_eq!(config.model_path, PathBuf::from("m.safetensors"));
        assert_eq!(config.export_dir, PathBuf::from("web/model"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["breathnet"]).is_err());
        assert!(Args::try_parse_from(["breathnet", "fit"]).is_err());
    }
}
