//! Runs several detection models over the same frame.

use std::sync::Arc;
use std::time::Instant;

use farm_models::DetectionResult;
use tracing::{debug, info};

use super::yolo::{YoloConfig, YoloDetector};
use super::DetectionModel;
use crate::error::{VisionError, VisionResult};
use crate::frame::FrameSample;
use crate::metrics;

/// Ordered set of detection models.
///
/// Results are concatenated in model order, and within a model in the order
/// the model reported them. No cross-model deduplication happens here.
#[derive(Clone, Default)]
pub struct DetectionEnsemble {
    models: Vec<Arc<dyn DetectionModel>>,
}

impl DetectionEnsemble {
    pub fn new(models: Vec<Arc<dyn DetectionModel>>) -> Self {
        Self { models }
    }

    /// Load every configured YOLO model, in order.
    pub fn from_configs(configs: &[YoloConfig]) -> VisionResult<Self> {
        let mut models: Vec<Arc<dyn DetectionModel>> = Vec::with_capacity(configs.len());
        for config in configs {
            models.push(Arc::new(YoloDetector::new(config.clone())?));
        }
        info!(count = models.len(), "Detection ensemble loaded");
        Ok(Self { models })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id())
    }

    /// Run every model on the frame and label the results.
    ///
    /// Any model failure aborts the whole run as an inference failure; no
    /// partial result is returned.
    pub fn infer(&self, frame: &FrameSample) -> VisionResult<Vec<DetectionResult>> {
        let mut results = Vec::new();

        for model in &self.models {
            let model_id = model.id();
            let start = Instant::now();
            let detections = model.detect(frame).map_err(|e| match e {
                VisionError::Inference { .. } => e,
                other => VisionError::inference(model_id, other.to_string()),
            });
            metrics::record_inference(model_id, start.elapsed().as_secs_f64(), detections.is_ok());
            let detections = detections?;

            let vocabulary = model.vocabulary();
            for detection in detections {
                let label = vocabulary.label(detection.class_id).ok_or_else(|| {
                    VisionError::inference(
                        model_id,
                        format!(
                            "Class index {} outside vocabulary of {} labels",
                            detection.class_id,
                            vocabulary.len()
                        ),
                    )
                })?;
                results.push(DetectionResult::new(model_id, label, detection.confidence));
            }

            debug!(model_id = %model_id, total = results.len(), "Model finished");
        }

        Ok(results)
    }
}
