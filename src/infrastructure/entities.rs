//! Database entities

use crate::core::equipment::{
    Equipment, EquipmentStatus, MaintenanceEvent, MaintenanceStatus, Sensor, SensorReading,
};
use crate::core::error::StoreError;
use serde::de::DeserializeOwned;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct EquipmentRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub status: String,
}

#[derive(Debug, FromRow)]
pub struct SensorRow {
    pub equipment_id: String,
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, FromRow)]
pub struct ReadingRow {
    pub equipment_id: String,
    pub sensor_name: String,
    pub hours_ago: i64,
    pub value: f64,
}

#[derive(Debug, FromRow)]
pub struct MaintenanceRow {
    pub id: String,
    pub equipment_id: String,
    pub date: String,
    pub description: String,
    pub status: String,
}

/// Parses a status column through its serde wire name.
fn status<T: DeserializeOwned>(id: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned())).map_err(|_| {
        StoreError::Corrupt {
            id: id.to_owned(),
            reason: format!("unknown status `{raw}`"),
        }
    })
}

/// Assembles equipment records from their rows.
///
/// Child rows are expected in display order: sensors by position, readings
/// oldest first, maintenance events newest first.
pub fn assemble(
    equipment: Vec<EquipmentRow>,
    sensors: Vec<SensorRow>,
    readings: Vec<ReadingRow>,
    maintenance: Vec<MaintenanceRow>,
) -> Result<Vec<Equipment>, StoreError> {
    let mut assembled = Vec::with_capacity(equipment.len());

    for row in equipment {
        let equipment_status: EquipmentStatus = status(&row.id, &row.status)?;

        let sensors = sensors
            .iter()
            .filter(|sensor| sensor.equipment_id == row.id)
            .map(|sensor| Sensor {
                name: sensor.name.clone(),
                value: sensor.value,
                unit: sensor.unit.clone(),
                history: readings
                    .iter()
                    .filter(|r| r.equipment_id == row.id && r.sensor_name == sensor.name)
                    .map(|r| SensorReading {
                        time: format!("{}h ago", r.hours_ago),
                        value: r.value,
                    })
                    .collect(),
            })
            .collect();

        let maintenance_log = maintenance
            .iter()
            .filter(|event| event.equipment_id == row.id)
            .map(|event| {
                let status: MaintenanceStatus = status(&event.id, &event.status)?;
                Ok(MaintenanceEvent {
                    id: event.id.clone(),
                    date: event.date.clone(),
                    description: event.description.clone(),
                    status,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        assembled.push(Equipment {
            id: row.id,
            name: row.name,
            kind: row.kind,
            status: equipment_status,
            sensors,
            maintenance_log,
        });
    }

    Ok(assembled)
}
