use burn::{data::dataloader::batcher::Batcher, tensor::backend::Backend};
use derive_new::new;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::{
    data::{FeatureBatcher, FeatureVector},
    error::InferenceError,
    model::{Classifier, ClassifierConfig},
    preprocessing::LabelEncoder,
};

pub const CROPS: [&str; 4] = ["papa", "zanahoria", "papaya", "mango"];

pub const FALLBACK_CLASS: &str = "Medio";

/// Base yield per class, in the order of `CROPS`.
const YIELD_TABLE: [(&str, [u32; 4]); 3] = [
    ("Alto", [28000, 38000, 50000, 22000]),
    ("Medio", [20000, 30000, 40000, 18000]),
    ("Bajo", [15000, 25000, 35000, 15000]),
];

/// Predicted yield class and the probability the model gave it.
#[derive(Debug, Clone, PartialEq, new)]
pub struct ClassPrediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuitabilityFactors {
    pub ph_suitability: f64,
    pub temperature_suitability: f64,
    pub humidity_suitability: f64,
    pub precipitation_suitability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropPrediction {
    pub crop: String,
    #[serde(rename = "yield")]
    pub yield_kg: u64,
    pub confidence: f64,
    pub suitability_factors: SuitabilityFactors,
}

/// Base yields for a class label; unknown labels use the `Medio` row.
pub fn base_yields(label: &str) -> [u32; 4] {
    YIELD_TABLE
        .iter()
        .find(|(class, _)| *class == label)
        .or_else(|| YIELD_TABLE.iter().find(|(class, _)| *class == FALLBACK_CLASS))
        .map(|(_, yields)| *yields)
        .unwrap_or_default()
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, value)| match best {
            Some((_, top)) if *value <= top => best,
            _ => Some((idx, *value)),
        })
        .map(|(idx, _)| idx)
}

/// Runs the classifier on one feature row and decodes the winning class.
pub fn predict_class<B: Backend>(
    model: &Classifier<B>,
    config: &ClassifierConfig,
    encoder: &LabelEncoder,
    features: &FeatureVector,
    device: B::Device,
) -> Result<ClassPrediction, InferenceError> {
    if features.width() != config.input_size {
        return Err(InferenceError::InputWidth {
            expected: config.input_size,
            got: features.width(),
        });
    }

    let batcher = FeatureBatcher::<B>::new(device);
    let input = batcher.batch(vec![features.clone()]);
    let probs = model
        .predict_proba(input)
        .to_data()
        .convert::<f32>()
        .value;
    debug!(?probs, "class probabilities");

    let class = argmax(&probs).ok_or(InferenceError::EmptyOutput)?;
    let label = encoder
        .inverse_transform(class)
        .ok_or(InferenceError::UnknownClass(class))?;

    Ok(ClassPrediction::new(label.to_string(), f64::from(probs[class])))
}

/// Expands the class prediction into per-crop estimates, best yield first.
///
/// Yield is the class base yield scaled by `0.9 + 0.2 * confidence`. Per-crop
/// confidence and the suitability factors are drawn from `rng`.
pub fn make_predictions<R: Rng>(prediction: &ClassPrediction, rng: &mut R) -> Vec<CropPrediction> {
    let yields = base_yields(&prediction.label);
    let confidence = prediction.confidence;
    let variation = confidence * 0.2 + 0.9;

    let mut results = CROPS
        .iter()
        .zip(yields)
        .map(|(crop, base_yield)| CropPrediction {
            crop: crop.to_string(),
            yield_kg: (f64::from(base_yield) * variation) as u64,
            confidence: confidence * (0.85 + rng.gen::<f64>() * 0.15),
            suitability_factors: SuitabilityFactors {
                ph_suitability: 0.7 + rng.gen::<f64>() * 0.3,
                temperature_suitability: 0.7 + rng.gen::<f64>() * 0.3,
                humidity_suitability: 0.7 + rng.gen::<f64>() * 0.3,
                precipitation_suitability: 0.7 + rng.gen::<f64>() * 0.3,
            },
        })
        .collect::<Vec<CropPrediction>>();

    results.sort_by(|a, b| b.yield_kg.cmp(&a.yield_kg));
    results
}
