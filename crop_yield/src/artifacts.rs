use std::{fs, io::ErrorKind, path::Path};

use burn::{
    config::Config,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::ArtifactError,
    model::{Classifier, ClassifierConfig, ClassifierRecord},
    preprocessing::{FeatureSelector, KMeans, LabelEncoder, PowerTransformer, RobustScaler},
};

pub const CLASSIFIER_CONFIG: &str = "classifier.json";
/// Record path handed to the recorder, which appends the `.mpk` extension.
pub const CLASSIFIER_RECORD: &str = "classifier";
pub const CLASSIFIER_RECORD_FILE: &str = "classifier.mpk";
pub const SCALER_FILE: &str = "robust_scaler.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const KMEANS_FILE: &str = "kmeans.json";
pub const POWER_TRANSFORMER_FILE: &str = "power_transformer.json";
pub const FEATURE_SELECTOR_FILE: &str = "feature_selector.json";

pub const REQUIRED_FILES: [&str; 5] = [
    CLASSIFIER_CONFIG,
    CLASSIFIER_RECORD_FILE,
    SCALER_FILE,
    LABEL_ENCODER_FILE,
    KMEANS_FILE,
];

pub const OPTIONAL_FILES: [&str; 2] = [POWER_TRANSFORMER_FILE, FEATURE_SELECTOR_FILE];

/// Preprocessor stored as a JSON document.
pub trait JsonArtifact: Serialize + DeserializeOwned {
    /// Structural self-consistency, checked right after decoding.
    fn check(&self) -> Result<(), String>;

    fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ArtifactError::Missing(path.to_path_buf()),
            _ => ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let artifact: Self = serde_json::from_str(&content).map_err(|source| ArtifactError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        artifact.check().map_err(|reason| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(artifact)
    }

    fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| ArtifactError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl JsonArtifact for RobustScaler {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl JsonArtifact for LabelEncoder {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl JsonArtifact for KMeans {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl JsonArtifact for PowerTransformer {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl JsonArtifact for FeatureSelector {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

/// Everything read from the model directory for one invocation.
#[derive(Debug)]
pub struct ArtifactBundle<B: Backend> {
    pub config: ClassifierConfig,
    pub model: Classifier<B>,
    pub scaler: RobustScaler,
    pub label_encoder: LabelEncoder,
    pub kmeans: KMeans,
    pub power_transformer: Option<PowerTransformer>,
    pub feature_selector: Option<FeatureSelector>,
}

impl<B: Backend> ArtifactBundle<B> {
    pub fn input_width(&self) -> usize {
        self.config.input_size
    }

    pub fn classes(&self) -> &[String] {
        &self.label_encoder.classes
    }

    /// Writes every present artifact under its fixed name, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let config_path = dir.join(CLASSIFIER_CONFIG);
        self.config.save(&config_path).map_err(|source| ArtifactError::Io {
            path: config_path.clone(),
            source,
        })?;
        self.model
            .clone()
            .save_file(dir.join(CLASSIFIER_RECORD), &CompactRecorder::new())
            .map_err(|err| ArtifactError::Classifier {
                path: dir.join(CLASSIFIER_RECORD_FILE),
                reason: err.to_string(),
            })?;

        self.scaler.save(&dir.join(SCALER_FILE))?;
        self.label_encoder.save(&dir.join(LABEL_ENCODER_FILE))?;
        self.kmeans.save(&dir.join(KMEANS_FILE))?;
        if let Some(power_transformer) = &self.power_transformer {
            power_transformer.save(&dir.join(POWER_TRANSFORMER_FILE))?;
        }
        if let Some(feature_selector) = &self.feature_selector {
            feature_selector.save(&dir.join(FEATURE_SELECTOR_FILE))?;
        }
        Ok(())
    }
}

fn load_classifier<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(ClassifierConfig, Classifier<B>), ArtifactError> {
    let config_path = dir.join(CLASSIFIER_CONFIG);
    if !config_path.exists() {
        return Err(ArtifactError::Missing(config_path));
    }
    let config = ClassifierConfig::load(&config_path).map_err(|err| ArtifactError::Classifier {
        path: config_path.clone(),
        reason: err.to_string(),
    })?;

    let record_path = dir.join(CLASSIFIER_RECORD_FILE);
    if !record_path.exists() {
        return Err(ArtifactError::Missing(record_path));
    }
    let record: ClassifierRecord<B> = CompactRecorder::new()
        .load(dir.join(CLASSIFIER_RECORD), device)
        .map_err(|err| ArtifactError::Classifier {
            path: record_path.clone(),
            reason: err.to_string(),
        })?;

    let model = config.init_with::<B>(record);
    Ok((config, model))
}

fn load_optional<T: JsonArtifact>(path: &Path) -> Option<T> {
    match T::load(path) {
        Ok(artifact) => Some(artifact),
        Err(ArtifactError::Missing(_)) => {
            debug!(path = %path.display(), "optional artifact absent");
            None
        }
        Err(err) => {
            warn!(error = %err, "optional artifact ignored");
            None
        }
    }
}

/// Reads the model directory. Mandatory artifacts fail the whole load; optional
/// ones are replaced by `None` on any error.
pub fn load_artifacts<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<ArtifactBundle<B>, ArtifactError> {
    let (config, model) = load_classifier::<B>(dir, device)?;
    let scaler = RobustScaler::load(&dir.join(SCALER_FILE))?;
    let label_encoder = LabelEncoder::load(&dir.join(LABEL_ENCODER_FILE))?;
    let kmeans = KMeans::load(&dir.join(KMEANS_FILE))?;

    let power_transformer = load_optional::<PowerTransformer>(&dir.join(POWER_TRANSFORMER_FILE));
    let feature_selector = load_optional::<FeatureSelector>(&dir.join(FEATURE_SELECTOR_FILE));

    info!(
        model_dir = %dir.display(),
        input_size = config.input_size,
        classes = label_encoder.classes.len(),
        clusters = kmeans.centroids.len(),
        power_transformer = power_transformer.as_ref().map(|p| p.lambdas.len()),
        selected_features = feature_selector.as_ref().map(FeatureSelector::n_selected),
        "loaded ML artifacts"
    );

    Ok(ArtifactBundle {
        config,
        model,
        scaler,
        label_encoder,
        kmeans,
        power_transformer,
        feature_selector,
    })
}

/// Presence report for the fixed artifact files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub model_available: bool,
    pub model_path: String,
    pub missing_files: Vec<String>,
    pub missing_optional_files: Vec<String>,
}

pub fn inspect_artifacts(dir: &Path) -> ArtifactStatus {
    let missing = |files: &[&str]| -> Vec<String> {
        files
            .iter()
            .filter(|file| !dir.join(file).is_file())
            .map(|file| file.to_string())
            .collect()
    };
    let missing_files = missing(&REQUIRED_FILES[..]);

    ArtifactStatus {
        model_available: missing_files.is_empty(),
        model_path: dir.display().to_string(),
        missing_files,
        missing_optional_files: missing(&OPTIONAL_FILES[..]),
    }
}
