//! Per-model detection records.

use serde::{Deserialize, Serialize};

/// One detected instance, labelled with the vocabulary of the model that found it.
///
/// Labels are not normalised across models: the same real-world object can
/// appear as `"ripe_tomato"` from one model and `"tomato"` from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Identifier of the model that produced the detection
    pub model_id: String,
    /// Label from that model's vocabulary
    pub label: String,
    /// Detection confidence [0, 1]
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(model_id: impl Into<String>, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            model_id: model_id.into(),
            label: label.into(),
            confidence,
        }
    }
}
