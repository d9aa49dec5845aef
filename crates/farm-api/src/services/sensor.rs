//! Sensor reading storage.

use std::collections::HashMap;

use async_trait::async_trait;
use farm_models::SensorReading;
use tokio::sync::RwLock;

use crate::error::ApiResult;

/// Where ingested sensor readings go.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Persist a reading and return it as stored.
    async fn insert(&self, reading: SensorReading) -> ApiResult<SensorReading>;

    /// Most recent reading for a farm.
    async fn latest(&self, farm_id: &str) -> ApiResult<Option<SensorReading>>;
}

/// Keeps the most recent readings per farm in memory.
pub struct InMemorySensorStore {
    readings: RwLock<HashMap<String, Vec<SensorReading>>>,
    retain_per_farm: usize,
}

impl InMemorySensorStore {
    pub fn new(retain_per_farm: usize) -> Self {
        Self {
            readings: RwLock::new(HashMap::new()),
            retain_per_farm: retain_per_farm.max(1),
        }
    }
}

impl Default for InMemorySensorStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl SensorStore for InMemorySensorStore {
    async fn insert(&self, reading: SensorReading) -> ApiResult<SensorReading> {
        let mut readings = self.readings.write().await;
        let farm = readings.entry(reading.farm_id.clone()).or_default();
        farm.push(reading.clone());
        if farm.len() > self.retain_per_farm {
            let excess = farm.len() - self.retain_per_farm;
            farm.drain(..excess);
        }
        Ok(reading)
    }

    async fn latest(&self, farm_id: &str) -> ApiResult<Option<SensorReading>> {
        let readings = self.readings.read().await;
        Ok(readings.get(farm_id).and_then(|r| r.last()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use farm_models::SensorReadingCreate;

    use super::*;

    fn reading(farm_id: &str, temperature: f64) -> SensorReading {
        SensorReading::new(
            farm_id,
            SensorReadingCreate {
                temperature,
                humidity: 55.0,
                soil_moisture: 40.0,
            },
        )
    }

    #[tokio::test]
    async fn test_latest_is_per_farm() {
        let store = InMemorySensorStore::default();
        assert!(store.latest("farm-1").await.unwrap().is_none());

        store.insert(reading("farm-1", 20.0)).await.unwrap();
        store.insert(reading("farm-1", 22.5)).await.unwrap();
        store.insert(reading("farm-2", 30.0)).await.unwrap();

        assert_eq!(store.latest("farm-1").await.unwrap().unwrap().temperature, 22.5);
        assert_eq!(store.latest("farm-2").await.unwrap().unwrap().temperature, 30.0);
    }

    #[tokio::test]
    async fn test_retention_cap() {
        let store = InMemorySensorStore::new(2);
        for t in [1.0, 2.0, 3.0] {
            store.insert(reading("farm-1", t)).await.unwrap();
        }
        let readings = store.readings.read().await;
        let temps: Vec<f64> = readings["farm-1"].iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![2.0, 3.0]);
    }
}
