//! Sensor telemetry reported by field devices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Incoming sensor reading from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SensorReadingCreate {
    /// Air temperature in degrees Celsius
    #[validate(range(min = -60.0, max = 80.0))]
    pub temperature: f64,
    /// Relative humidity in percent
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: f64,
    /// Soil moisture in percent
    #[validate(range(min = 0.0, max = 100.0))]
    pub soil_moisture: f64,
}

/// Stored sensor reading, scoped to a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub farm_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub recorded_at: DateTime<Utc>,
}

impl SensorReading {
    /// Stamp an incoming reading for a farm.
    pub fn new(farm_id: impl Into<String>, reading: SensorReadingCreate) -> Self {
        Self {
            id: Uuid::new_v4(),
            farm_id: farm_id.into(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            soil_moisture: reading.soil_moisture,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bounds() {
        let ok = SensorReadingCreate {
            temperature: 24.5,
            humidity: 61.0,
            soil_moisture: 38.0,
        };
        assert!(ok.validate().is_ok());

        let bad = SensorReadingCreate {
            humidity: 140.0,
            ..ok
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_new_reading_keeps_values() {
        let reading = SensorReading::new(
            "farm-1",
            SensorReadingCreate {
                temperature: 20.0,
                humidity: 50.0,
                soil_moisture: 30.0,
            },
        );
        assert_eq!(reading.farm_id, "farm-1");
        assert_eq!(reading.soil_moisture, 30.0);
    }
}
