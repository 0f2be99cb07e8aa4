// tests/pipeline_test.rs
//
// Build -> train -> save -> export, through the library and the binary.
//
// Run with: cargo test --test pipeline_test -- --nocapture

mod test_utils;

use breathnet::dataset::labels_path_for;
use breathnet::export::{
    convert_model, LayersModelJson, Preprocessing, LABELS_JSON, MODEL_JSON, PREPROCESSING_JSON, WEIGHTS_SHARD,
};
use breathnet::{DatasetBuilder, LabelMap, ModelArtifact, PipelineConfig, PipelineError, Trainer};
use test_utils::{quick_config, run_breathnet, separable_dataset, silent_dataset};

const PARAMETER_COUNT: usize = 17_217;

#[test]
fn test_train_save_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    separable_dataset(root, 10);

    let config = quick_config(root, 8);
    let dataset = DatasetBuilder::new(&config).unwrap().build(root).unwrap();
    assert_eq!(dataset.len(), 100);

    let trained = Trainer::new(&config).unwrap().train(dataset).unwrap();
    let report = &trained.report;
    assert_eq!(report.epochs.len(), 8);
    assert_eq!((report.train_size, report.test_size), (80, 20));
    assert!(report.feature_scale > 0.0);
    assert!(report.test_loss.is_finite());
    println!("test accuracy after 8 epochs: {:.4}", report.test_accuracy);
    assert!(report.test_accuracy >= 0.75);

    trained.save(&config.model_path).unwrap();
    let labels_path = labels_path_for(&config.model_path);
    assert!(labels_path.ends_with("model.labels.json"));
    assert_eq!(LabelMap::load(&labels_path).unwrap().classes, vec!["noise", "breath"]);

    let artifact = ModelArtifact::load(&config.model_path).unwrap();
    assert_eq!(artifact.label_map, trained.label_map);
    assert_eq!(artifact.test_accuracy, Some(report.test_accuracy));
    assert!(artifact.trained_at.is_some());

    let summary = convert_model(&config.model_path, &config.export_dir).unwrap();
    assert_eq!(summary.weight_count, PARAMETER_COUNT);
    assert_eq!(summary.weight_bytes, PARAMETER_COUNT * 4);

    let shard = std::fs::read(config.export_dir.join(WEIGHTS_SHARD)).unwrap();
    assert_eq!(shard.len(), PARAMETER_COUNT * 4);

    let text = std::fs::read_to_string(config.export_dir.join(MODEL_JSON)).unwrap();
    let model: LayersModelJson = serde_json::from_str(&text).unwrap();
    assert_eq!(model.format, "layers-model");
    assert_eq!(model.weights_manifest.len(), 1);
    assert_eq!(model.weights_manifest[0].paths, vec![WEIGHTS_SHARD.to_string()]);

    let names: Vec<_> = model.weights_manifest[0].weights.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "conv2d/kernel",
            "conv2d/bias",
            "conv2d_1/kernel",
            "conv2d_1/bias",
            "dense/kernel",
            "dense/bias",
            "dense_1/kernel",
            "dense_1/bias",
        ]
    );
    assert_eq!(model.weights_manifest[0].weights[0].shape, vec![3, 3, 1, 16]);
    assert_eq!(model.weights_manifest[0].weights[4].shape, vec![192, 64]);

    let layers = &model.model_topology["config"]["layers"];
    assert_eq!(layers[0]["config"]["batch_input_shape"], serde_json::json!([null, 32, 13, 1]));

    let exported = LabelMap::load(&config.export_dir.join(LABELS_JSON)).unwrap();
    assert_eq!(exported, trained.label_map);

    let text = std::fs::read_to_string(config.export_dir.join(PREPROCESSING_JSON)).unwrap();
    let preprocessing: Preprocessing = serde_json::from_str(&text).unwrap();
    assert_eq!(preprocessing.feature_scale, report.feature_scale);
}

#[test]
fn test_silent_dataset_does_not_train_on_nan() {
    let dir = tempfile::tempdir().unwrap();
    silent_dataset(dir.path());

    let config = PipelineConfig {
        noise_factor: 0.0,
        ..quick_config(dir.path(), 2)
    };
    let dataset = DatasetBuilder::new(&config).unwrap().build(dir.path()).unwrap();
    assert_eq!(dataset.len(), 25);

    // Silence still has a constant non-zero c0, so normalization is well defined
    let trained = Trainer::new(&config).unwrap().train(dataset).unwrap();
    assert_eq!((trained.report.train_size, trained.report.test_size), (20, 5));
    assert!(trained.report.epochs.iter().all(|e| e.train_loss.is_finite()));
}

#[test]
fn test_single_class_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    silent_dataset(dir.path());
    std::fs::remove_dir_all(dir.path().join("breath")).unwrap();
    std::fs::create_dir(dir.path().join("breath")).unwrap();

    let config = quick_config(dir.path(), 1);
    let dataset = DatasetBuilder::new(&config).unwrap().build(dir.path()).unwrap();
    let err = Trainer::new(&config).unwrap().train(dataset).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::DegenerateDataset(_))
    ));
}

#[test]
fn test_export_rejects_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let result = convert_model(&dir.path().join("absent.safetensors"), &dir.path().join("web"));
    assert!(result.is_err());
    assert!(!dir.path().join("web").join(MODEL_JSON).exists());
}

#[test]
fn test_cli_dataset_and_config() {
    let dir = tempfile::tempdir().unwrap();
    silent_dataset(dir.path());

    let output = run_breathnet()
        .arg("dataset")
        .arg("--dataset")
        .arg(dir.path())
        .output()
        .expect("Failed to execute breathnet");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Examples: 25"), "{}", stdout);

    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{ "epochs": 3, "labels": ["breath", "noise"] }"#).unwrap();
    let output = run_breathnet()
        .arg("--config")
        .arg(&config_path)
        .arg("config")
        .output()
        .expect("Failed to execute breathnet");
    assert!(output.status.success());
    let effective: PipelineConfig = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(effective.epochs, 3);
    assert_eq!(effective.labels, vec!["breath", "noise"]);
    assert_eq!(effective.batch_size, 32);
}

#[test]
fn test_cli_train_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    separable_dataset(root, 4);
    let model_path = root.join("out").join("cli_model.safetensors");
    let web_dir = root.join("web");

    let output = run_breathnet()
        .arg("train")
        .arg("--dataset")
        .arg(root)
        .arg("--model")
        .arg(&model_path)
        .arg("--epochs")
        .arg("1")
        .output()
        .expect("Failed to execute breathnet");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Model trained successfully"), "{}", stdout);
    assert!(model_path.exists());
    assert!(labels_path_for(&model_path).exists());

    let output = run_breathnet()
        .arg("export")
        .arg("--model")
        .arg(&model_path)
        .arg("--output")
        .arg(&web_dir)
        .output()
        .expect("Failed to execute breathnet");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    for name in [MODEL_JSON, WEIGHTS_SHARD, LABELS_JSON, PREPROCESSING_JSON] {
        assert!(web_dir.join(name).exists(), "missing {}", name);
    }
    let shard = std::fs::read(web_dir.join(WEIGHTS_SHARD)).unwrap();
    assert_eq!(shard.len(), PARAMETER_COUNT * 4);
}

#[test]
fn test_cli_missing_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_breathnet()
        .arg("dataset")
        .arg("--dataset")
        .arg(dir.path().join("nowhere"))
        .output()
        .expect("Failed to execute breathnet");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}
