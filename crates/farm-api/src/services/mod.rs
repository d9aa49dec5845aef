//! Business logic services.

pub mod actuator;
pub mod sensor;

pub use actuator::ActuatorStateCache;
pub use sensor::{InMemorySensorStore, SensorStore};
