use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetric {
    pub id: String,
    pub kind: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Store {
    pub fn record_system_metric(&self, kind: &str, payload: serde_json::Value) -> Result<SystemMetric, StoreError> {
        let metric = SystemMetric {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            recorded_at: Utc::now(),
            payload,
        };
        let key = keys::system_metric_key(kind, metric.recorded_at.timestamp_millis(), &metric.id)?;
        self.system_metrics
            .insert(key.as_bytes(), Self::serialize(&metric)?)?;
        Ok(metric)
    }

    pub fn list_system_metrics(&self, kind: &str, limit: usize) -> Result<Vec<SystemMetric>, StoreError> {
        let prefix = keys::system_metric_prefix(kind)?;
        let mut metrics = Vec::new();
        for entry in self.system_metrics.scan_prefix(prefix.as_bytes()) {
            if metrics.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            metrics.push(Self::deserialize::<SystemMetric>(&value)?);
        }
        Ok(metrics)
    }
}
