//! Actuator (window) status reported by field devices.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical state of a window actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorStatus {
    Open,
    /// State assumed before any device has reported.
    #[default]
    Closed,
}

impl ActuatorStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorStatus::Open => "open",
            ActuatorStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ActuatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status received: {0}")]
pub struct InvalidActuatorStatus(pub String);

impl FromStr for ActuatorStatus {
    type Err = InvalidActuatorStatus;

    /// Exact match only; `"Open"` or `" open"` are rejected like any other value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ActuatorStatus::Open),
            "closed" => Ok(ActuatorStatus::Closed),
            other => Err(InvalidActuatorStatus(other.to_string())),
        }
    }
}

/// Last known actuator status plus when it was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActuatorSnapshot {
    pub status: ActuatorStatus,
    /// `None` until the first device report.
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legal_values() {
        assert_eq!("open".parse::<ActuatorStatus>(), Ok(ActuatorStatus::Open));
        assert_eq!("closed".parse::<ActuatorStatus>(), Ok(ActuatorStatus::Closed));
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for raw in ["unknown", "close", "OPEN", " open", ""] {
            let err = raw.parse::<ActuatorStatus>().unwrap_err();
            assert_eq!(err.0, raw);
        }
    }

    #[test]
    fn test_default_is_closed() {
        assert_eq!(ActuatorStatus::default(), ActuatorStatus::Closed);
        let snapshot = ActuatorSnapshot::default();
        assert_eq!(snapshot.status, ActuatorStatus::Closed);
        assert!(snapshot.updated_at.is_none());
    }

    #[test]
    fn test_serde_wire_form() {
        assert_eq!(serde_json::to_string(&ActuatorStatus::Open).unwrap(), "\"open\"");
        let parsed: ActuatorStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(parsed, ActuatorStatus::Closed);
    }
}
