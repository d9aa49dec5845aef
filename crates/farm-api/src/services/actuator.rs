//! Last reported actuator (window) state.

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use farm_models::{ActuatorSnapshot, ActuatorStatus, InvalidActuatorStatus};
use tracing::info;

/// Process-wide actuator state, `closed` until a device reports.
///
/// Accessed from request handlers on a multi-threaded runtime; every
/// operation is a short in-memory read or write.
#[derive(Debug, Default)]
pub struct ActuatorStateCache {
    state: RwLock<ActuatorSnapshot>,
}

impl ActuatorStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a device report.
    ///
    /// Only `"open"` and `"closed"` are accepted; anything else leaves the
    /// stored state untouched.
    pub fn report(&self, raw: &str) -> Result<ActuatorStatus, InvalidActuatorStatus> {
        let status: ActuatorStatus = raw.parse()?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = state.status;
        *state = ActuatorSnapshot {
            status,
            updated_at: Some(Utc::now()),
        };

        info!(status = %status, previous = %previous, "Actuator status updated");
        Ok(status)
    }

    /// Last reported status, or `closed`.
    pub fn read(&self) -> ActuatorStatus {
        self.snapshot().status
    }

    pub fn snapshot(&self) -> ActuatorSnapshot {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_closed() {
        let cache = ActuatorStateCache::new();
        assert_eq!(cache.read(), ActuatorStatus::Closed);
        assert!(cache.snapshot().updated_at.is_none());
    }

    #[test]
    fn test_round_trip() {
        let cache = ActuatorStateCache::new();
        assert_eq!(cache.report("open").unwrap(), ActuatorStatus::Open);
        assert_eq!(cache.read(), ActuatorStatus::Open);
        assert!(cache.snapshot().updated_at.is_some());

        cache.report("closed").unwrap();
        assert_eq!(cache.read(), ActuatorStatus::Closed);
    }

    #[test]
    fn test_invalid_report_keeps_prior_state() {
        let cache = ActuatorStateCache::new();
        cache.report("open").unwrap();
        let before = cache.snapshot();

        let err = cache.report("unknown").unwrap_err();
        assert_eq!(err.to_string(), "Invalid status received: unknown");
        assert_eq!(cache.snapshot(), before);
    }
}
