//! Vision configuration loaded from environment variables.

use std::time::Duration;

use tracing::info;

use crate::acquisition::{open_source, AcquisitionConfig, StreamAcquisition};
use crate::aggregate::AggregationPolicy;
use crate::detection::{DetectionEnsemble, YoloConfig};
use crate::error::{VisionError, VisionResult};
use crate::orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
use crate::pipeline::InspectionPipeline;
use crate::source_lock::SingleFlightPolicy;

/// Default model list: custom crop model first, stock COCO second.
pub const DEFAULT_MODELS: &str =
    "custom=models/best.onnx:models/best.labels,coco=models/yolov8n.onnx";

/// Everything needed to assemble an [`AnalysisOrchestrator`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Camera identifier: device index, stream URL, or `stub://...`
    pub camera_source: String,
    pub acquisition: AcquisitionConfig,
    pub models: Vec<YoloConfig>,
    pub aggregation: AggregationPolicy,
    pub orchestrator: OrchestratorConfig,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_source: "0".to_string(),
            acquisition: AcquisitionConfig::default(),
            models: Vec::new(),
            aggregation: AggregationPolicy::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl VisionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> VisionResult<Self> {
        let defaults = AcquisitionConfig::default();
        let acquisition = AcquisitionConfig {
            max_retries: env_parse("CAMERA_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay: env_millis("CAMERA_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay),
            open_timeout: env_millis("CAMERA_OPEN_TIMEOUT_MS").unwrap_or(defaults.open_timeout),
            read_timeout: env_millis("CAMERA_READ_TIMEOUT_MS").unwrap_or(defaults.read_timeout),
        };
        acquisition.validate()?;

        let template = YoloConfig {
            confidence_threshold: env_parse("VISION_CONFIDENCE").unwrap_or(0.25),
            nms_threshold: env_parse("VISION_NMS").unwrap_or(0.45),
            input_size: env_parse("VISION_INPUT_SIZE").unwrap_or(640),
            ..Default::default()
        };
        let model_list =
            std::env::var("VISION_MODELS").unwrap_or_else(|_| DEFAULT_MODELS.to_string());
        let models = parse_model_list(&model_list, &template)?;

        let aggregation = match std::env::var("ANALYSIS_AGGREGATION") {
            Ok(value) => value
                .parse::<AggregationPolicy>()
                .map_err(VisionError::invalid_config)?,
            Err(_) => AggregationPolicy::default(),
        };

        let wait_timeout = env_millis("ANALYSIS_QUEUE_TIMEOUT_MS").unwrap_or(Duration::from_secs(90));
        let single_flight = match std::env::var("ANALYSIS_SINGLE_FLIGHT")
            .unwrap_or_else(|_| "queue".to_string())
            .to_lowercase()
            .as_str()
        {
            "queue" => SingleFlightPolicy::Queue { wait_timeout },
            "reject" => SingleFlightPolicy::Reject,
            other => {
                return Err(VisionError::invalid_config(format!(
                    "Unknown single-flight policy: {}",
                    other
                )))
            }
        };

        Ok(Self {
            camera_source: std::env::var("CAMERA_SOURCE").unwrap_or_else(|_| "0".to_string()),
            acquisition,
            models,
            aggregation,
            orchestrator: OrchestratorConfig {
                workers: env_parse("ANALYSIS_WORKERS").unwrap_or(2),
                single_flight,
            },
        })
    }

    /// Open the camera source, load the models, and wire the orchestrator.
    pub fn build(&self) -> VisionResult<AnalysisOrchestrator> {
        self.acquisition.validate()?;
        let source = open_source(&self.camera_source)?;
        let acquisition = StreamAcquisition::new(source, self.acquisition.clone());
        let ensemble = DetectionEnsemble::from_configs(&self.models)?;

        info!(
            source = %self.camera_source,
            models = ?ensemble.model_ids().collect::<Vec<_>>(),
            aggregation = %self.aggregation,
            workers = self.orchestrator.workers,
            "Analysis pipeline ready"
        );

        let pipeline = InspectionPipeline::new(acquisition, ensemble, self.aggregation);
        Ok(AnalysisOrchestrator::new(pipeline, self.orchestrator))
    }
}

/// Parse `id=path[:labels_path]` entries separated by commas.
pub fn parse_model_list(list: &str, template: &YoloConfig) -> VisionResult<Vec<YoloConfig>> {
    let mut models = Vec::new();

    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (model_id, paths) = entry.split_once('=').ok_or_else(|| {
            VisionError::invalid_config(format!("Model entry '{}' must be id=path", entry))
        })?;
        let (model_path, labels_path) = match paths.split_once(':') {
            Some((model, labels)) => (model, Some(labels.trim().to_string())),
            None => (paths, None),
        };

        let model_id = model_id.trim();
        if model_id.is_empty() || model_path.trim().is_empty() {
            return Err(VisionError::invalid_config(format!(
                "Model entry '{}' must be id=path",
                entry
            )));
        }
        if models.iter().any(|m: &YoloConfig| m.model_id == model_id) {
            return Err(VisionError::invalid_config(format!(
                "Duplicate model id '{}'",
                model_id
            )));
        }

        models.push(YoloConfig {
            model_id: model_id.to_string(),
            model_path: model_path.trim().to_string(),
            labels_path,
            ..template.clone()
        });
    }

    Ok(models)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_model_list() {
        let models = parse_model_list(DEFAULT_MODELS, &YoloConfig::default()).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].model_id, "custom");
        assert_eq!(models[0].labels_path.as_deref(), Some("models/best.labels"));
        assert_eq!(models[1].model_id, "coco");
        assert_eq!(models[1].model_path, "models/yolov8n.onnx");
        assert!(models[1].labels_path.is_none());
    }

    #[test]
    fn test_parse_model_list_carries_thresholds() {
        let template = YoloConfig {
            confidence_threshold: 0.5,
            ..Default::default()
        };
        let models = parse_model_list("weeds=w.onnx", &template).unwrap();
        assert!((models[0].confidence_threshold - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_model_list_errors() {
        let template = YoloConfig::default();
        assert!(parse_model_list("no-equals-sign", &template).is_err());
        assert!(parse_model_list("a=x.onnx,a=y.onnx", &template).is_err());
        assert!(parse_model_list("", &template).unwrap().is_empty());
    }

    #[test]
    fn test_build_rejects_zero_retries() {
        let config = VisionConfig {
            camera_source: "stub://greenhouse".to_string(),
            acquisition: AcquisitionConfig {
                max_retries: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(VisionError::InvalidConfig(_))));

        let config = VisionConfig {
            camera_source: "stub://greenhouse".to_string(),
            ..Default::default()
        };
        assert_eq!(config.build().unwrap().model_count(), 0);
    }
}
