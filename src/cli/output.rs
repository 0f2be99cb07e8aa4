//! Output formatting for CLI results

use colorful::Colorful;

use crate::dataset::Dataset;
use crate::export::ExportSummary;
use crate::training::TrainingReport;

/// Format per-class dataset counts
pub fn format_dataset_summary(dataset: &Dataset) -> String {
    let mut output = String::new();

    output.push_str(&format!("  Examples: {}\n", dataset.len()));
    if let Some((frames, coeffs)) = dataset.feature_shape() {
        output.push_str(&format!("  Feature shape: {} frames x {} coefficients\n", frames, coeffs));
    }

    for class in &dataset.summary.classes {
        output.push_str(&format!(
            "    [{}] {:<12} {:>4} files -> {:>5} examples\n",
            class.label, class.name, class.files, class.examples
        ));
    }

    if !dataset.summary.skipped.is_empty() {
        output.push_str(&format!("  Skipped {} undecodable file(s):\n", dataset.summary.skipped.len()));
        for path in &dataset.summary.skipped {
            output.push_str(&format!("    • {}\n", path.display()));
        }
    }

    output
}

pub fn print_dataset_summary(dataset: &Dataset) {
    print!("{}", format_dataset_summary(dataset));
    if dataset.summary.classes.iter().any(|c| c.examples == 0) {
        println!("  {}", "⚠ At least one class has no examples".yellow());
    }
}

pub fn print_training_report(report: &TrainingReport) {
    println!("  Train/test: {}/{}", report.train_size, report.test_size);
    println!("  Feature scale: {:.3}", report.feature_scale);
    if let Some(last) = report.epochs.last() {
        println!(
            "  Final epoch {}: loss {:.4}, accuracy {:.4}",
            last.epoch, last.train_loss, last.train_accuracy
        );
    }
    println!(
        "  Test Accuracy: {}",
        format!("{:.4}", report.test_accuracy).green()
    );
}

pub fn print_export_summary(summary: &ExportSummary) {
    println!(
        "  {} weights ({} bytes) written to {}",
        summary.weight_count,
        summary.weight_bytes,
        summary.output_dir.display().to_string().cyan()
    );
    for file in &summary.files {
        println!("    • {}", file.display());
    }
}
