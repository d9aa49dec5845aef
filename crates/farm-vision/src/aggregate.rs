//! Collapses labelled detections into per-label counts.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use farm_models::{AnalysisReport, DetectionResult, NONE_SENTINEL};
use serde::{Deserialize, Serialize};

/// How counts from different models combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Every detection counts once, regardless of which model found it.
    #[default]
    Sum,
    /// Per label, keep the largest count any single model reported.
    MaxPerModel,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::Sum => "sum",
            AggregationPolicy::MaxPerModel => "max_per_model",
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggregationPolicy::Sum),
            "max_per_model" | "max" => Ok(AggregationPolicy::MaxPerModel),
            other => Err(format!("Unknown aggregation policy: {}", other)),
        }
    }
}

/// Outcome of aggregating one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedCount {
    /// Nothing was detected.
    None,
    /// `(label, count)` pairs in order of first appearance.
    Counts(Vec<(String, u32)>),
}

impl AggregatedCount {
    /// Render as `"<count> <label>"` lines, or the single `"none"` line.
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            AggregatedCount::None => vec![NONE_SENTINEL.to_string()],
            AggregatedCount::Counts(counts) => counts
                .iter()
                .map(|(label, count)| format!("{} {}", count, label))
                .collect(),
        }
    }

    pub fn to_report(&self) -> AnalysisReport {
        AnalysisReport {
            result: self.to_lines(),
        }
    }

    /// Total number of counted detections.
    pub fn total(&self) -> u32 {
        match self {
            AggregatedCount::None => 0,
            AggregatedCount::Counts(counts) => counts.iter().map(|(_, c)| c).sum(),
        }
    }
}

/// Count detections by label.
///
/// Labels are compared exactly; `"tomato"` and `"ripe_tomato"` stay separate.
pub fn aggregate(detections: &[DetectionResult], policy: AggregationPolicy) -> AggregatedCount {
    if detections.is_empty() {
        return AggregatedCount::None;
    }

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, u32> = HashMap::new();

    match policy {
        AggregationPolicy::Sum => {
            for detection in detections {
                let label = detection.label.as_str();
                let count = counts.entry(label).or_insert_with(|| {
                    order.push(label);
                    0
                });
                *count += 1;
            }
        }
        AggregationPolicy::MaxPerModel => {
            let mut per_model: HashMap<(&str, &str), u32> = HashMap::new();
            for detection in detections {
                let label = detection.label.as_str();
                if !counts.contains_key(label) {
                    order.push(label);
                    counts.insert(label, 0);
                }
                let model_count = per_model
                    .entry((detection.model_id.as_str(), label))
                    .or_insert(0);
                *model_count += 1;
                let best = counts.entry(label).or_insert(0);
                *best = (*best).max(*model_count);
            }
        }
    }

    AggregatedCount::Counts(
        order
            .into_iter()
            .map(|label| (label.to_string(), counts[label]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(model: &str, label: &str) -> DetectionResult {
        DetectionResult::new(model, label, 0.9)
    }

    #[test]
    fn test_empty_is_none_sentinel() {
        let agg = aggregate(&[], AggregationPolicy::Sum);
        assert_eq!(agg, AggregatedCount::None);
        assert_eq!(agg.to_lines(), vec!["none"]);
        assert!(agg.to_report().is_none());
    }

    #[test]
    fn test_counts_keep_first_seen_order() {
        let detections = vec![
            det("custom", "ripe_tomato"),
            det("custom", "unripe_tomato"),
            det("custom", "ripe_tomato"),
            det("coco", "tomato"),
        ];
        let agg = aggregate(&detections, AggregationPolicy::Sum);
        assert_eq!(agg.to_lines(), vec!["2 ripe_tomato", "1 unripe_tomato", "1 tomato"]);
        assert_eq!(agg.total(), 4);
    }

    #[test]
    fn test_sum_does_not_dedupe_across_models() {
        let detections = vec![det("a", "person"), det("b", "person"), det("b", "person")];
        assert_eq!(
            aggregate(&detections, AggregationPolicy::Sum).to_lines(),
            vec!["3 person"]
        );
    }

    #[test]
    fn test_max_per_model() {
        let detections = vec![
            det("a", "person"),
            det("b", "dog"),
            det("b", "person"),
            det("b", "person"),
        ];
        assert_eq!(
            aggregate(&detections, AggregationPolicy::MaxPerModel).to_lines(),
            vec!["2 person", "1 dog"]
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("sum".parse::<AggregationPolicy>().unwrap(), AggregationPolicy::Sum);
        assert_eq!(
            "MAX_PER_MODEL".parse::<AggregationPolicy>().unwrap(),
            AggregationPolicy::MaxPerModel
        );
        assert!("mean".parse::<AggregationPolicy>().is_err());
    }
}
