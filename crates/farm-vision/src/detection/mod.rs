//! Object detection models and the ensemble that runs them together.
//!
//! Every [`DetectionModel`] reports raw class indices; the ensemble maps them
//! through that model's own [`LabelVocabulary`].

pub mod ensemble;
pub mod vocabulary;
pub mod yolo;

pub use ensemble::DetectionEnsemble;
pub use vocabulary::{LabelVocabulary, COCO_CLASSES};
pub use yolo::{YoloConfig, YoloDetector};

use crate::error::VisionResult;
use crate::frame::FrameSample;

/// A detected object in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDetection {
    /// Bounding box in normalized coordinates [0, 1]
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Index into the producing model's vocabulary
    pub class_id: usize,
    /// Detection confidence [0, 1]
    pub confidence: f32,
}

impl ObjectDetection {
    /// Get area (normalized).
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// A detector with its own label vocabulary.
///
/// `detect` is blocking and may be slow; callers run it on a worker thread.
pub trait DetectionModel: Send + Sync {
    /// Identifier reported on every result from this model.
    fn id(&self) -> &str;

    /// Class index → label mapping for this model's outputs.
    fn vocabulary(&self) -> &LabelVocabulary;

    /// Detect objects in one frame.
    fn detect(&self, frame: &FrameSample) -> VisionResult<Vec<ObjectDetection>>;
}
