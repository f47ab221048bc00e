//! Equipment records as served by the read-only equipment store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EquipmentStatus {
    Operational,
    Warning,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MaintenanceStatus {
    Completed,
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
}

/// One historical sample of a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SensorReading {
    pub time: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sensor {
    pub name: String,
    pub value: f64,
    pub unit: String,
    /// Ordered oldest to newest.
    pub history: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceEvent {
    pub id: String,
    pub date: String,
    pub description: String,
    pub status: MaintenanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: EquipmentStatus,
    pub sensors: Vec<Sensor>,
    /// Newest event first.
    pub maintenance_log: Vec<MaintenanceEvent>,
}

impl Equipment {
    /// Matches a routed reference against this record: exact id, or name and id
    /// compared case-insensitively.
    pub fn matches(&self, reference: &str) -> bool {
        let reference = reference.trim();
        !reference.is_empty()
            && (self.id == reference
                || self.id.eq_ignore_ascii_case(reference)
                || self.name.to_lowercase() == reference.to_lowercase())
    }

    /// Current sensor values keyed by sensor name, the diagnostics input shape.
    pub fn sensor_values(&self) -> std::collections::BTreeMap<String, f64> {
        self.sensors
            .iter()
            .map(|sensor| (sensor.name.clone(), sensor.value))
            .collect()
    }
}
