//! The blocking acquire → detect → aggregate pipeline.

use tracing::info;

use crate::acquisition::StreamAcquisition;
use crate::aggregate::{aggregate, AggregatedCount, AggregationPolicy};
use crate::detection::DetectionEnsemble;
use crate::error::VisionResult;
use crate::frame::FrameSample;

/// One camera feeding one model ensemble.
#[derive(Clone)]
pub struct InspectionPipeline {
    acquisition: StreamAcquisition,
    ensemble: DetectionEnsemble,
    policy: AggregationPolicy,
}

impl InspectionPipeline {
    pub fn new(
        acquisition: StreamAcquisition,
        ensemble: DetectionEnsemble,
        policy: AggregationPolicy,
    ) -> Self {
        Self {
            acquisition,
            ensemble,
            policy,
        }
    }

    pub fn source_id(&self) -> &str {
        self.acquisition.source_id()
    }

    pub fn ensemble(&self) -> &DetectionEnsemble {
        &self.ensemble
    }

    /// Grab one frame. The device is closed again before this returns.
    pub fn capture(&self) -> VisionResult<FrameSample> {
        self.acquisition.acquire()
    }

    /// Run every model on the frame and count the labels.
    pub fn detect(&self, frame: &FrameSample) -> VisionResult<AggregatedCount> {
        let detections = self.ensemble.infer(frame)?;
        let counts = aggregate(&detections, self.policy);
        info!(
            source = %self.source_id(),
            detections = detections.len(),
            labels = ?counts.to_lines(),
            "Frame analyzed"
        );
        Ok(counts)
    }

    /// Capture then detect.
    pub fn run(&self) -> VisionResult<AggregatedCount> {
        let frame = self.capture()?;
        self.detect(&frame)
    }
}
