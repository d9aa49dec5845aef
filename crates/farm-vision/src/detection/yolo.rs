//! Object detection using YOLOv8-format ONNX models.
//!
//! Works for stock COCO weights and for custom-trained exports alike; the
//! class count is taken from the model's label vocabulary. Execution
//! providers are picked automatically:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use super::vocabulary::LabelVocabulary;
use super::{DetectionModel, ObjectDetection};
use crate::error::{VisionError, VisionResult};
use crate::frame::FrameSample;

/// Configuration for one YOLO model.
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Identifier reported on every detection from this model
    pub model_id: String,
    /// Path to ONNX model file
    pub model_path: String,
    /// Label file; COCO classes when absent
    pub labels_path: Option<String>,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_id: "coco".to_string(),
            model_path: "models/yolov8n.onnx".to_string(),
            labels_path: None,
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 detector running on ONNX Runtime.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: YoloConfig,
    vocabulary: LabelVocabulary,
}

impl YoloDetector {
    /// Load the model and its vocabulary.
    ///
    /// Returns error if the model file doesn't exist or cannot be loaded.
    pub fn new(config: YoloConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::model_not_found(&config.model_path));
        }

        let vocabulary = match &config.labels_path {
            Some(path) => LabelVocabulary::load(path)?,
            None => LabelVocabulary::coco(),
        };

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_id = %config.model_id,
            model_path = %config.model_path,
            classes = vocabulary.len(),
            input_size = config.input_size,
            "Detection model initialized"
        );

        Ok(Self {
            session,
            config,
            vocabulary,
        })
    }

    fn inference_error(&self, message: impl Into<String>) -> VisionError {
        VisionError::inference(&self.config.model_id, message)
    }

    /// Preprocess image for YOLOv8 inference.
    ///
    /// - Resize to model input size
    /// - Normalize pixel values to [0, 1]
    /// - Convert to NCHW format (batch, channels, height, width)
    fn preprocess(&self, img: &DynamicImage) -> VisionResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        // HWC -> CHW with normalization to [0, 1]
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| self.inference_error(format!("Failed to create tensor: {}", e)))
    }

    /// Run ONNX inference.
    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| self.inference_error("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| self.inference_error(format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 4 + classes, candidates]
        let output = outputs
            .get("output0")
            .ok_or_else(|| self.inference_error("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| self.inference_error(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl DetectionModel for YoloDetector {
    fn id(&self) -> &str {
        &self.config.model_id
    }

    fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    fn detect(&self, frame: &FrameSample) -> VisionResult<Vec<ObjectDetection>> {
        let img = frame.to_dynamic_image()?;
        let input = self.preprocess(&img)?;
        let outputs = self.run_inference(input)?;

        let candidates = decode_output(
            &outputs,
            self.vocabulary.len(),
            self.config.input_size,
            frame.width(),
            frame.height(),
            self.config.confidence_threshold,
        )
        .map_err(|e| self.inference_error(e.to_string()))?;
        let detections = non_maximum_suppression(candidates, self.config.nms_threshold);

        debug!(
            model_id = %self.config.model_id,
            count = detections.len(),
            "Object detection completed"
        );

        Ok(detections)
    }
}

/// Decode a raw YOLOv8 output tensor into thresholded candidates.
///
/// Layout is `[1, 4 + num_classes, num_boxes]`: four box rows (cx, cy, w, h in
/// model pixels) followed by one score row per class.
pub fn decode_output(
    outputs: &[f32],
    num_classes: usize,
    input_size: u32,
    orig_width: u32,
    orig_height: u32,
    confidence_threshold: f32,
) -> VisionResult<Vec<ObjectDetection>> {
    let num_features = 4 + num_classes;
    if outputs.is_empty() || outputs.len() % num_features != 0 {
        return Err(VisionError::internal(format!(
            "Unexpected output size {} for {} classes",
            outputs.len(),
            num_classes
        )));
    }
    let num_boxes = outputs.len() / num_features;

    // [features, boxes] -> [boxes, features]
    let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
        .map_err(|e| VisionError::internal(format!("Failed to reshape output: {}", e)))?;
    let transposed = output_array.t();

    let input_size = input_size as f32;
    let scale_w = orig_width as f32 / input_size;
    let scale_h = orig_height as f32 / input_size;

    let mut candidates = Vec::new();
    for i in 0..num_boxes {
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..num_classes {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < confidence_threshold {
            continue;
        }

        // Center format in model pixels -> normalized corner format
        let x_norm = (cx - w / 2.0) * scale_w / orig_width as f32;
        let y_norm = (cy - h / 2.0) * scale_h / orig_height as f32;
        let w_norm = w * scale_w / orig_width as f32;
        let h_norm = h * scale_h / orig_height as f32;

        let x_clamped = x_norm.clamp(0.0, 1.0);
        let y_clamped = y_norm.clamp(0.0, 1.0);

        candidates.push(ObjectDetection {
            x: x_clamped,
            y: y_clamped,
            width: w_norm.min(1.0 - x_clamped),
            height: h_norm.min(1.0 - y_clamped),
            class_id: best_class,
            confidence: best_score,
        });
    }

    Ok(candidates)
}

/// Per-class Non-Maximum Suppression.
pub fn non_maximum_suppression(
    mut detections: Vec<ObjectDetection>,
    iou_threshold: f32,
) -> Vec<ObjectDetection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if compute_iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over Union of two normalized boxes.
pub fn compute_iou(a: &ObjectDetection, b: &ObjectDetection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::internal(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| VisionError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::internal(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::internal(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, class_id: usize, confidence: f32) -> ObjectDetection {
        ObjectDetection {
            x,
            y: 0.1,
            width: 0.2,
            height: 0.2,
            class_id,
            confidence,
        }
    }

    /// Build a [4 + classes, boxes] tensor from per-box rows.
    fn tensor(rows: &[[f32; 6]]) -> Vec<f32> {
        let num_features = 6;
        let mut out = vec![0.0; num_features * rows.len()];
        for (b, row) in rows.iter().enumerate() {
            for f in 0..num_features {
                out[f * rows.len() + b] = row[f];
            }
        }
        out
    }

    #[test]
    fn test_config_default() {
        let config = YoloConfig::default();
        assert_eq!(config.input_size, 640);
        assert!((config.confidence_threshold - 0.25).abs() < 0.001);
        assert!((config.nms_threshold - 0.45).abs() < 0.001);
    }

    #[test]
    fn test_missing_model_file() {
        let config = YoloConfig {
            model_path: "models/does-not-exist.onnx".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            YoloDetector::new(config),
            Err(VisionError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_decode_picks_best_class_and_thresholds() {
        // Two classes; box 0 is class 1 at 0.9, box 1 is below threshold.
        let outputs = tensor(&[
            [320.0, 320.0, 64.0, 64.0, 0.1, 0.9],
            [100.0, 100.0, 10.0, 10.0, 0.2, 0.1],
        ]);
        let found = decode_output(&outputs, 2, 640, 640, 640, 0.25).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class_id, 1);
        assert!((found[0].x - 0.45).abs() < 0.001);
        assert!((found[0].width - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_decode_rejects_mismatched_class_count() {
        let outputs = vec![0.0; 7];
        assert!(decode_output(&outputs, 2, 640, 640, 640, 0.25).is_err());
    }

    #[test]
    fn test_nms_suppresses_same_class_only() {
        let kept = non_maximum_suppression(
            vec![det(0.10, 0, 0.8), det(0.11, 0, 0.9), det(0.10, 1, 0.7)],
            0.45,
        );
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 0.001);
        assert_eq!(kept[1].class_id, 1);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let kept = non_maximum_suppression(vec![det(0.0, 0, 0.8), det(0.6, 0, 0.7)], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = det(0.1, 0, 0.9);
        assert!((compute_iou(&a, &a) - 1.0).abs() < 0.001);
    }
}
