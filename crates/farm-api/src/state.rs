//! Application state.

use std::sync::Arc;

use farm_vision::{AnalysisOrchestrator, VisionConfig};

use crate::auth::{AuthGate, JwtAuthGate};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::services::{ActuatorStateCache, InMemorySensorStore, SensorStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub actuator: Arc<ActuatorStateCache>,
    pub sensors: Arc<dyn SensorStore>,
    pub auth: Arc<dyn AuthGate>,
}

impl AppState {
    /// Create new application state: load models, open the camera source,
    /// and set up the token gate.
    pub fn new(config: ApiConfig, vision: &VisionConfig) -> Result<Self, ApiError> {
        let secret = config
            .jwt_secret
            .clone()
            .ok_or_else(|| ApiError::internal("JWT_SECRET must be set"))?;
        let orchestrator = vision.build()?;

        Ok(Self::from_parts(
            config,
            orchestrator,
            Arc::new(JwtAuthGate::new(&secret)),
        ))
    }

    /// Assemble state from pre-built parts, with fresh in-memory stores.
    pub fn from_parts(
        config: ApiConfig,
        orchestrator: AnalysisOrchestrator,
        auth: Arc<dyn AuthGate>,
    ) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            actuator: Arc::new(ActuatorStateCache::new()),
            sensors: Arc::new(InMemorySensorStore::default()),
            auth,
        }
    }
}
