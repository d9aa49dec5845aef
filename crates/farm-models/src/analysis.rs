//! Photo analysis report returned to clients.

use serde::{Deserialize, Serialize};

/// Single result entry reported when no model detected anything.
pub const NONE_SENTINEL: &str = "none";

/// Response body of the analysis endpoint.
///
/// Each entry is `"<count> <label>"`, or the list is exactly `["none"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: Vec<String>,
}

impl AnalysisReport {
    /// Report for a run without detections.
    pub fn none() -> Self {
        Self {
            result: vec![NONE_SENTINEL.to_string()],
        }
    }

    /// Check if this report is the "nothing detected" sentinel.
    pub fn is_none(&self) -> bool {
        self.result.len() == 1 && self.result[0] == NONE_SENTINEL
    }
}
