//! Shared data models for the FarmWatch backend.
//!
//! This crate provides Serde-serializable types for:
//! - Actuator (window) status reports and snapshots
//! - Per-model detections produced by the vision pipeline
//! - Analysis reports returned to clients
//! - Sensor readings ingested from field devices

pub mod actuator;
pub mod analysis;
pub mod detection;
pub mod sensor;

// Re-export common types
pub use actuator::{ActuatorSnapshot, ActuatorStatus, InvalidActuatorStatus};
pub use analysis::{AnalysisReport, NONE_SENTINEL};
pub use detection::DetectionResult;
pub use sensor::{SensorReading, SensorReadingCreate};
