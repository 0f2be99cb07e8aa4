// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{Args, Command};
pub use output::{format_dataset_summary, print_dataset_summary, print_export_summary, print_training_report};

use anyhow::Result;
use colorful::Colorful;

use crate::config::PipelineConfig;
use crate::dataset::DatasetBuilder;
use crate::export::convert_model;
use crate::training::Trainer;

/// Run the CLI
pub fn run(args: Args) -> Result<()> {
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    args.command.apply_overrides(&mut config);
    config.validate()?;

    match &args.command {
        Command::Config => {
            println!("{}", config.to_json()?);
        }
        Command::Dataset { .. } => {
            println!("Building dataset: {}", config.dataset_root.display().to_string().cyan());
            let dataset = DatasetBuilder::new(&config)?
                .show_progress(true)
                .build(&config.dataset_root)?;
            print_dataset_summary(&dataset);
        }
        Command::Train { .. } => {
            println!("Building dataset: {}", config.dataset_root.display().to_string().cyan());
            let dataset = DatasetBuilder::new(&config)?
                .show_progress(true)
                .build(&config.dataset_root)?;
            print_dataset_summary(&dataset);

            println!("\nTraining for {} epoch(s)", config.epochs);
            let trained = Trainer::new(&config)?.train(dataset)?;
            trained.save(&config.model_path)?;

            println!("{}", "✓ Model trained successfully".green());
            println!("  Saved to: {}", config.model_path.display());
            print_training_report(&trained.report);
        }
        Command::Export { .. } => {
            println!("Converting: {}", config.model_path.display().to_string().cyan());
            let summary = convert_model(&config.model_path, &config.export_dir)?;
            println!("{}", "✓ Model converted to TensorFlow.js format".green());
            print_export_summary(&summary);
        }
    }

    Ok(())
}
