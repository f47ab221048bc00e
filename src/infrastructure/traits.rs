//! Infrastructure traits, used for DI on higher levels

use crate::core::equipment::Equipment;
use crate::core::error::StoreError;
use async_trait::async_trait;

/// Read-only access to the equipment store.
#[async_trait]
pub trait EquipmentRepository: Send + Sync {
    /// Every record, in fleet order.
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StoreError>;

    async fn find_equipment(&self, id: &str) -> Result<Option<Equipment>, StoreError>;
}
