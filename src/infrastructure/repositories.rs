//! DB Repository abstractions

use crate::core::equipment::Equipment;
use crate::core::error::StoreError;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    self, EquipmentRow, MaintenanceRow, ReadingRow, SensorRow,
};
use crate::infrastructure::traits::EquipmentRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::error;

#[injectable(EquipmentRepository)]
pub struct DbEquipmentRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbEquipmentRepository {
    /// Loads every record, or only `id` when given.
    async fn load(&self, id: Option<&str>) -> Result<Vec<Equipment>, StoreError> {
        let equipment: Vec<EquipmentRow> = sqlx::query_as(
            "SELECT id, name, kind, status FROM equipment WHERE (?1 IS NULL OR id = ?1) ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&**self.connection)
        .await?;

        if equipment.is_empty() {
            return Ok(Vec::new());
        }

        let sensors: Vec<SensorRow> = sqlx::query_as(
            "SELECT equipment_id, name, value, unit FROM sensors WHERE (?1 IS NULL OR equipment_id = ?1) ORDER BY equipment_id, position ASC",
        )
        .bind(id)
        .fetch_all(&**self.connection)
        .await?;

        let readings: Vec<ReadingRow> = sqlx::query_as(
            "SELECT equipment_id, sensor_name, hours_ago, value FROM sensor_readings WHERE (?1 IS NULL OR equipment_id = ?1) ORDER BY equipment_id, sensor_name, hours_ago DESC",
        )
        .bind(id)
        .fetch_all(&**self.connection)
        .await?;

        let maintenance: Vec<MaintenanceRow> = sqlx::query_as(
            "SELECT id, equipment_id, date, description, status FROM maintenance_events WHERE (?1 IS NULL OR equipment_id = ?1) ORDER BY date DESC, id DESC",
        )
        .bind(id)
        .fetch_all(&**self.connection)
        .await?;

        entities::assemble(equipment, sensors, readings, maintenance)
    }
}

#[async_trait]
impl EquipmentRepository for DbEquipmentRepository {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StoreError> {
        self.load(None).await.inspect_err(|e| error!("{e}"))
    }

    async fn find_equipment(&self, id: &str) -> Result<Option<Equipment>, StoreError> {
        let mut found = self.load(Some(id)).await.inspect_err(|e| error!("{e}"))?;
        Ok(found.pop())
    }
}
