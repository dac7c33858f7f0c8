use serde::Serialize;

use crate::inference::CropPrediction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub classes: Vec<String>,
    pub model_input_shape: [Option<usize>; 2],
    pub preprocessing_applied: bool,
}

/// The single JSON object written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        success: bool,
        predictions: Vec<CropPrediction>,
        model_info: ModelInfo,
    },
    Failure {
        success: bool,
        error: String,
        predictions: Vec<CropPrediction>,
    },
}

impl Envelope {
    pub fn success(predictions: Vec<CropPrediction>, model_info: ModelInfo) -> Self {
        Envelope::Success {
            success: true,
            predictions,
            model_info,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Envelope::Failure {
            success: false,
            error: error.to_string(),
            predictions: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// Process exit code matching this envelope.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> String {
        // non-finite floats serialize as null, so this does not fail in practice
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"success": false, "error": {:?}, "predictions": []}}"#, err.to_string())
        })
    }
}
