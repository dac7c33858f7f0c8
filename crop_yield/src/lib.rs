//! Crop yield prediction bridge.
//!
//! Loads a trained yield-class classifier and its preprocessors from a model
//! directory, turns one farm record into features, and expands the predicted
//! class into per-crop yield estimates. Every call reloads the artifacts.

pub mod artifacts;
pub mod data;
pub mod error;
pub mod inference;
pub mod model;
pub mod output;
pub mod preprocessing;

use std::path::Path;

use burn::tensor::backend::Backend;
use rand::Rng;
use tracing::info;

use crate::{
    artifacts::load_artifacts,
    data::{preprocess_input, InputRecord},
    error::PredictError,
    inference::{make_predictions, predict_class},
    output::{Envelope, ModelInfo},
};

/// One full request: parse, load, preprocess, infer, post-process.
///
/// The input is parsed before any artifact is read, so a malformed record never
/// touches the model directory.
pub fn run_prediction<B: Backend, R: Rng>(
    input_json: &str,
    model_dir: &Path,
    device: B::Device,
    rng: &mut R,
) -> Result<Envelope, PredictError> {
    let record =
        InputRecord::from_json(input_json).map_err(|err| PredictError::Input(err.to_string()))?;

    let bundle = load_artifacts::<B>(model_dir, &device)?;

    let features = preprocess_input(
        &record,
        &bundle.scaler,
        Some(&bundle.kmeans),
        bundle.input_width(),
    )?;

    let prediction = predict_class(
        &bundle.model,
        &bundle.config,
        &bundle.label_encoder,
        &features,
        device,
    )?;
    info!(class = %prediction.label, confidence = prediction.confidence, "predicted yield class");

    let predictions = make_predictions(&prediction, rng);

    Ok(Envelope::success(
        predictions,
        ModelInfo {
            classes: bundle.classes().to_vec(),
            model_input_shape: bundle.config.input_shape(),
            preprocessing_applied: true,
        },
    ))
}
