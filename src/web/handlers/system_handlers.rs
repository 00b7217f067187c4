// src/web/handlers/system_handlers.rs

use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use super::ApiResult;
use crate::core::Notification;
use crate::web::types::{DataResponse, StandardErrorResponse, TextResponse};
use crate::web::AppState;

pub async fn health_handler(state: &State<AppState>) -> ApiResult<TextResponse> {
    match state.database.health_check().await {
        Ok(()) => Ok(Json(TextResponse::success("OK".to_string(), None))),
        Err(e) => {
            error!("Health check failed: {}", e);
            Err(Json(StandardErrorResponse::new(
                "Database is unavailable".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

/// Hand out and forget everything queued since the last poll.
pub async fn notifications_handler(state: &State<AppState>) -> Json<DataResponse<Vec<Notification>>> {
    let notifications = state.feed.drain();
    Json(DataResponse::success(
        format!("{} notifications", notifications.len()),
        notifications,
        None,
    ))
}
