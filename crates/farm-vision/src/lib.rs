//! Camera-to-counts vision pipeline for farm monitoring.
//!
//! This crate provides:
//! - Bounded-retry frame acquisition from USB/RTSP cameras (OpenCV) or a synthetic source
//! - Multi-model YOLOv8 detection with per-model label vocabularies
//! - Label counting across models
//! - Single-flight camera access and a bounded worker pool for analysis runs

pub mod acquisition;
pub mod aggregate;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod source_lock;

pub use acquisition::{open_source, AcquisitionConfig, CaptureDevice, StreamAcquisition, VideoSource};
pub use aggregate::{aggregate, AggregatedCount, AggregationPolicy};
pub use config::VisionConfig;
pub use detection::{DetectionEnsemble, DetectionModel, LabelVocabulary, ObjectDetection, YoloConfig};
pub use error::{VisionError, VisionResult};
pub use frame::{FrameSample, RawImage};
pub use orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
pub use pipeline::InspectionPipeline;
pub use source_lock::{SingleFlightPolicy, SourceLease, SourceLocks};
