//! Error types for vision operations.

use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while acquiring frames or running detection.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The source never yielded a usable frame within the retry budget.
    #[error("All {attempts} frame-grab attempts failed for source '{source_id}'")]
    AcquisitionExhausted { source_id: String, attempts: u32 },

    /// The source could not be opened, or a read raised instead of reporting failure.
    #[error("Capture failed for source '{source_id}': {message}")]
    Capture { source_id: String, message: String },

    /// Another acquisition holds the source.
    #[error("Camera source '{0}' is busy")]
    SourceBusy(String),

    /// A model invocation itself failed.
    #[error("Inference failed in model '{model_id}': {message}")]
    Inference { model_id: String, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    /// Create a capture failure error.
    pub fn capture(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capture {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inference {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable kind, used for metrics labels and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            VisionError::AcquisitionExhausted { .. } => "acquisition_exhausted",
            VisionError::Capture { .. } => "capture_failed",
            VisionError::SourceBusy(_) => "source_busy",
            VisionError::Inference { .. } => "inference_failure",
            VisionError::ModelNotFound(_) => "model_not_found",
            VisionError::InvalidConfig(_) => "invalid_config",
            VisionError::Io(_) => "io",
            VisionError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_distinguish_camera_from_model() {
        let camera = VisionError::AcquisitionExhausted {
            source_id: "0".to_string(),
            attempts: 5,
        };
        let model = VisionError::inference("coco", "session closed");
        assert_ne!(camera.kind(), model.kind());
        assert_eq!(camera.to_string(), "All 5 frame-grab attempts failed for source '0'");
    }
}
