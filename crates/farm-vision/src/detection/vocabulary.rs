//! Per-model label vocabularies.

use std::path::Path;

use crate::error::{VisionError, VisionResult};

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Class index → label mapping owned by a single model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(labels: Vec<String>) -> VisionResult<Self> {
        if labels.is_empty() {
            return Err(VisionError::invalid_config("Label vocabulary is empty"));
        }
        Ok(Self { labels })
    }

    /// The 80 COCO classes used by stock YOLOv8 weights.
    pub fn coco() -> Self {
        Self {
            labels: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load labels from a text file.
    ///
    /// Accepts one label per line, or `index: label` lines as exported from a
    /// training `names:` mapping. Blank lines and `#` comments are skipped.
    pub fn load(path: impl AsRef<Path>) -> VisionResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VisionError::model_not_found(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse label file contents.
    pub fn parse(contents: &str) -> VisionResult<Self> {
        let mut indexed: Vec<(usize, String)> = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let entry = match line.split_once(':') {
                Some((idx, name)) if idx.trim().chars().all(|c| c.is_ascii_digit()) => {
                    let idx = idx.trim().parse::<usize>().map_err(|_| {
                        VisionError::invalid_config(format!("Bad class index on line {}", line_no + 1))
                    })?;
                    (idx, unquote(name.trim()).to_string())
                }
                _ => (indexed.len(), unquote(line).to_string()),
            };
            indexed.push(entry);
        }

        indexed.sort_by_key(|(idx, _)| *idx);
        for (expected, (idx, _)) in indexed.iter().enumerate() {
            if *idx != expected {
                return Err(VisionError::invalid_config(format!(
                    "Label indices must be contiguous from 0 (missing {})",
                    expected
                )));
            }
        }

        Self::new(indexed.into_iter().map(|(_, name)| name).collect())
    }

    /// Label for a class index, if the model's vocabulary covers it.
    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_classes() {
        let vocab = LabelVocabulary::coco();
        assert_eq!(vocab.len(), 80);
        assert_eq!(vocab.label(0), Some("person"));
        assert_eq!(vocab.label(80), None);
    }

    #[test]
    fn test_parse_plain_lines() {
        let vocab = LabelVocabulary::parse("ripe_tomato\nunripe_tomato\n\n# comment\nleaf_blight\n").unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.label(2), Some("leaf_blight"));
    }

    #[test]
    fn test_parse_indexed_lines() {
        let vocab = LabelVocabulary::parse("1: 'unripe_tomato'\n0: ripe_tomato\n").unwrap();
        assert_eq!(vocab.label(0), Some("ripe_tomato"));
        assert_eq!(vocab.label(1), Some("unripe_tomato"));
    }

    #[test]
    fn test_parse_rejects_gaps_and_empty() {
        assert!(LabelVocabulary::parse("0: a\n2: c\n").is_err());
        assert!(LabelVocabulary::parse("\n# nothing\n").is_err());
    }
}
