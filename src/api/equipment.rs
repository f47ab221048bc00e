//! Equipment endpoints

use crate::core::equipment::Equipment;
use crate::infrastructure::traits::EquipmentRepository;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use log::error;
use serde::Serialize;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_equipment))
        .route("/:id", get(equipment_by_id))
}

#[derive(Serialize, Debug, Default)]
pub struct EquipmentList {
    pub equipment: Vec<Equipment>,
}

async fn list_equipment(
    Inject(repository): Inject<dyn EquipmentRepository>,
) -> (StatusCode, Json<EquipmentList>) {
    match repository.list_equipment().await {
        Ok(equipment) => (StatusCode::OK, Json(EquipmentList { equipment })),
        Err(e) => {
            error!("{e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EquipmentList::default()),
            )
        }
    }
}

async fn equipment_by_id(
    Inject(repository): Inject<dyn EquipmentRepository>,
    Path(id): Path<String>,
) -> Result<Json<Equipment>, StatusCode> {
    match repository.find_equipment(&id).await {
        Ok(Some(equipment)) => Ok(Json(equipment)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("{e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
