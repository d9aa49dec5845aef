//! Axum HTTP API server for farm monitoring.
//!
//! This crate provides:
//! - Photo analysis over the farm camera (multi-model object counting)
//! - Window actuator status reporting
//! - Sensor telemetry ingestion
//! - Bearer token authentication, rate limiting, and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthGate, Identity, JwtAuthGate};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{ActuatorStateCache, InMemorySensorStore, SensorStore};
pub use state::AppState;
