use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading one of the files in the model directory.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{} not found", .0.display())]
    Missing(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("cannot load classifier from {}: {reason}", .path.display())]
    Classifier { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("column '{0}' not found in input")]
    MissingColumn(String),
    #[error("column '{column}' holds an unsupported value: {value}")]
    UnsupportedValue { column: String, value: String },
    #[error("feature '{0}' was not seen when the scaler was fitted")]
    UnseenFeature(String),
    #[error("could not convert value of '{column}' to float: '{value}'")]
    NotNumeric { column: String, value: String },
    #[error("input contains NaN or infinity in '{0}'")]
    NonFinite(String),
    #[error("clustering expects {expected} features, got {got}")]
    ClusterWidth { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model expects {expected} input features, got {got}")]
    InputWidth { expected: usize, got: usize },
    #[error("model produced no class probabilities")]
    EmptyOutput,
    #[error("class index {0} is not known to the label encoder")]
    UnknownClass(usize),
}

/// Everything that can end an invocation early. The `Display` output is the
/// message placed in the failure envelope.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("exactly 2 arguments are required: input_json and model_path")]
    Usage,
    #[error("invalid input JSON: {0}")]
    Input(String),
    #[error("error loading ML artifacts: {0}")]
    Artifacts(#[from] ArtifactError),
    #[error("preprocessing error: {0}")]
    Preprocessing(#[from] PreprocessError),
    #[error("prediction error: {0}")]
    Inference(#[from] InferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefixes() {
        let err: PredictError = ArtifactError::Missing(PathBuf::from("/m/kmeans.json")).into();
        assert_eq!(err.to_string(), "error loading ML artifacts: /m/kmeans.json not found");

        let err: PredictError = PreprocessError::MissingColumn("Tipo de suelo".into()).into();
        assert_eq!(
            err.to_string(),
            "preprocessing error: column 'Tipo de suelo' not found in input"
        );

        let err: PredictError = InferenceError::InputWidth { expected: 5, got: 4 }.into();
        assert_eq!(err.to_string(), "prediction error: model expects 5 input features, got 4");
    }

    #[test]
    fn test_usage_message() {
        assert_eq!(
            PredictError::Usage.to_string(),
            "exactly 2 arguments are required: input_json and model_path"
        );
    }
}
