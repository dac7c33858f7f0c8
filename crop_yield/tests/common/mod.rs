#![allow(dead_code)]

use std::{
    path::Path,
    process::{Command, Output},
};

use burn::backend::{ndarray::NdArrayDevice, NdArray};
use crop_yield::{
    artifacts::ArtifactBundle,
    model::ClassifierConfig,
    preprocessing::{FeatureSelector, KMeans, LabelEncoder, PowerTransformer, RobustScaler},
};
use serde_json::Value;

pub type TestBackend = NdArray<f32>;

pub const EXAMPLE_INPUT: &str = r#"{"ph_suelo":6.5,"tipo_suelo":"arcilloso","textura_suelo":"media","temperatura":22,"precipitacion":800,"humedad":65,"practicas_agricolas":"organica"}"#;

pub const CLASSES: [&str; 3] = ["Alto", "Bajo", "Medio"];

pub const CROPS: [&str; 4] = ["papa", "zanahoria", "papaya", "mango"];

/// Writes a complete bundle whose scaler knows the four numeric fields plus the cluster.
pub fn write_bundle(dir: &Path, input_size: usize) {
    let device = NdArrayDevice::Cpu;
    let config = ClassifierConfig::new(input_size, CLASSES.len());
    let model = config.init::<TestBackend>(&device);

    let bundle = ArtifactBundle {
        config,
        model,
        scaler: RobustScaler::new(
            [
                "pH del suelo",
                "Temperatura (°C)",
                "Precipitación (mm)",
                "Humedad (%)",
                "Cluster",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            vec![6.2, 21.0, 750.0, 60.0, 1.0],
            vec![1.1, 6.0, 300.0, 15.0, 1.0],
        ),
        label_encoder: LabelEncoder::new(CLASSES.iter().map(|c| c.to_string()).collect()),
        kmeans: KMeans::new(vec![vec![-1.0; 4], vec![0.0; 4], vec![1.0; 4]]),
        power_transformer: Some(PowerTransformer::new(
            "yeo-johnson".into(),
            vec![1.2, 0.8, 0.5, 1.0],
        )),
        feature_selector: Some(FeatureSelector::new(vec![true, true, true, true, true])),
    };
    bundle.save(dir).unwrap();
}

pub fn run_bin(bin: &str, args: &[&str]) -> Output {
    Command::new(bin).args(args).output().unwrap()
}

/// Exit code and the single JSON object printed on stdout.
pub fn run_predictor(args: &[&str]) -> (i32, Value) {
    single_envelope(run_bin(env!("CARGO_BIN_EXE_crop_yield"), args))
}

/// Same as `run_predictor`, with `cwd` as the working directory.
pub fn run_predictor_in(cwd: &Path, args: &[&str]) -> (i32, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_crop_yield"))
        .current_dir(cwd)
        .args(args)
        .output()
        .unwrap();
    single_envelope(output)
}

fn single_envelope(output: Output) -> (i32, Value) {
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "expected one line on stdout, got {stdout:?}");
    (output.status.code().unwrap(), serde_json::from_str(lines[0]).unwrap())
}
