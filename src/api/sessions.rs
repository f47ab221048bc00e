//! Chat session endpoints

use crate::core::conversation::ConversationTurn;
use crate::core::error::SessionError;
use crate::core::router::BagLocation;
use crate::core::session::{EmergencyConfirmation, SessionSnapshot, TurnOutcome};
use crate::core::traits::ChatService;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use di_axum::Inject;
use serde::Deserialize;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(end_session))
        .route("/:id/messages", post(post_message))
        .route("/:id/selection", put(select_equipment))
        .route("/:id/find-bag", post(find_bag))
        .route("/:id/order/confirm", post(confirm_order))
        .route("/:id/emergency/confirm", post(confirm_emergency))
}

#[derive(Deserialize, Debug)]
pub struct CreateMessage {
    pub text: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SelectEquipment {
    pub equipment_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FindBag {
    pub bag_id: String,
}

async fn create_session(
    Inject(chat): Inject<dyn ChatService>,
) -> Result<(StatusCode, Json<SessionSnapshot>), SessionError> {
    let session = chat.create_session().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, SessionError> {
    Ok(Json(chat.session(session_id).await?))
}

async fn end_session(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
    chat.end_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_message(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
    Json(message): Json<CreateMessage>,
) -> Result<Json<TurnOutcome>, SessionError> {
    Ok(Json(chat.send_message(session_id, message.text).await?))
}

async fn select_equipment(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
    Json(selection): Json<SelectEquipment>,
) -> Result<Json<SessionSnapshot>, SessionError> {
    Ok(Json(
        chat.select_equipment(session_id, selection.equipment_id)
            .await?,
    ))
}

async fn find_bag(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<FindBag>,
) -> Result<Json<BagLocation>, SessionError> {
    Ok(Json(chat.submit_bag_id(session_id, request.bag_id).await?))
}

async fn confirm_order(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ConversationTurn>, SessionError> {
    Ok(Json(chat.confirm_order(session_id).await?))
}

async fn confirm_emergency(
    Inject(chat): Inject<dyn ChatService>,
    Path(session_id): Path<Uuid>,
) -> Result<(StatusCode, Json<EmergencyConfirmation>), SessionError> {
    let confirmation = chat.confirm_emergency(session_id).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}
