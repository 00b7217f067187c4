// src/web/handlers/position_handlers.rs

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use super::{reject, ApiResult};
use crate::types::{Position, PositionId, PositionMetrics, PositionPatch};
use crate::web::types::{
    ActionResponse, CreatePositionRequest, DataResponse, StandardRequest, UpdatePositionRequest,
    ViewModeRequest, WithConversationId,
};
use crate::web::AppState;
use crate::workflow::PositionSnapshot;

pub async fn list_positions_handler(state: &State<AppState>) -> ApiResult<DataResponse<Vec<Position>>> {
    let positions = state
        .workflow
        .load_positions()
        .await
        .map_err(|e| reject("Failed to list positions", e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} positions", positions.len()),
        positions,
        None,
    )))
}

pub async fn create_position_handler(
    request: Json<StandardRequest<CreatePositionRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionSnapshot>> {
    let conversation_id = request.conversation_id();
    let snapshot = state
        .workflow
        .create_position(&request.data.title, &request.data.organization)
        .await
        .map_err(|e| reject("Failed to create position", e, conversation_id.clone()))?;

    info!("Position {} created via API", snapshot.position.id);
    Ok(Json(DataResponse::success(
        format!("Position '{}' created", snapshot.position.title),
        snapshot,
        conversation_id,
    )))
}

pub async fn update_position_handler(
    id: &str,
    request: Json<StandardRequest<UpdatePositionRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Position>> {
    let conversation_id = request.conversation_id();
    let request = request.into_inner().data;
    let patch = PositionPatch {
        title: request.title,
        organization: request.organization,
        status: request.status,
    };

    let position = state
        .workflow
        .update_position(&PositionId::from(id), &patch)
        .await
        .map_err(|e| reject("Failed to update position", e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Position updated".to_string(),
        position,
        conversation_id,
    )))
}

pub async fn delete_position_handler(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    state
        .workflow
        .delete_position(&PositionId::from(id))
        .await
        .map_err(|e| reject("Failed to delete position", e, None))?;

    Ok(Json(ActionResponse::success(
        format!("Position {} deleted", id),
        "deleted".to_string(),
        None,
    )))
}

pub async fn select_position_handler(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionSnapshot>> {
    let snapshot = state
        .workflow
        .select_position(&PositionId::from(id))
        .await
        .map_err(|e| reject("Failed to open position", e, None))?;

    Ok(Json(DataResponse::success(
        format!("Opened '{}'", snapshot.position.title),
        snapshot,
        None,
    )))
}

pub async fn set_view_mode_handler(
    id: &str,
    request: Json<StandardRequest<ViewModeRequest>>,
    state: &State<AppState>,
) -> Json<ActionResponse> {
    let mode = request.data.mode;
    state
        .workflow
        .set_view_mode(&PositionId::from(id), mode)
        .await;

    Json(ActionResponse::success(
        format!("Switched to {:?} view", mode),
        "view_mode_changed".to_string(),
        request.conversation_id(),
    ))
}

pub async fn metrics_handler(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionMetrics>> {
    let metrics = state
        .workflow
        .metrics(&PositionId::from(id))
        .await
        .map_err(|e| reject("Failed to compute metrics", e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} candidates", metrics.total_matches),
        metrics,
        None,
    )))
}
