// src/web/handlers/candidate_handlers.rs

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use super::{reject, ApiResult};
use crate::types::{CandidateMatch, FeedbackAnalytics, FeedbackRecord, MatchId, PositionId};
use crate::web::types::{
    ActionResponse, DataResponse, FeedbackRequest, MatchFilterRequest, MatchStatusRequest,
    StandardRequest, WithConversationId,
};
use crate::web::AppState;

pub async fn matches_handler(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CandidateMatch>>> {
    let matches = state
        .workflow
        .matches(&PositionId::from(id))
        .await
        .map_err(|e| reject("Failed to load candidates", e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} candidates", matches.len()),
        matches,
        None,
    )))
}

pub async fn set_match_filter_handler(
    request: Json<StandardRequest<MatchFilterRequest>>,
    state: &State<AppState>,
) -> Json<ActionResponse> {
    let conversation_id = request.conversation_id();
    state
        .workflow
        .set_match_filter(request.into_inner().data.into())
        .await;

    Json(ActionResponse::success(
        "Candidate filter applied".to_string(),
        "filtered".to_string(),
        conversation_id,
    ))
}

pub async fn match_status_handler(
    id: &str,
    match_id: &str,
    request: Json<StandardRequest<MatchStatusRequest>>,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    let conversation_id = request.conversation_id();
    let status = request.data.status;
    state
        .workflow
        .update_match_status(&PositionId::from(id), &MatchId::from(match_id), status)
        .await
        .map_err(|e| reject("Failed to update candidate", e, conversation_id.clone()))?;

    Ok(Json(ActionResponse::success(
        format!("Candidate marked {}", status.as_str()),
        "status_updated".to_string(),
        conversation_id,
    )))
}

pub async fn feedback_handler(
    id: &str,
    request: Json<StandardRequest<FeedbackRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<FeedbackRecord>> {
    let conversation_id = request.conversation_id();
    let request = request.into_inner().data;
    let record = state
        .workflow
        .submit_feedback(
            &PositionId::from(id),
            &MatchId::from(request.match_id),
            request.decision,
            request.notes,
        )
        .await
        .map_err(|e| reject("Failed to record feedback", e, conversation_id.clone()))?;

    info!("Feedback {} recorded for position {}", record.id, id);
    Ok(Json(DataResponse::success(
        format!("Candidate {}", record.decision.as_str()),
        record,
        conversation_id,
    )))
}

pub async fn analytics_handler(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<FeedbackAnalytics>> {
    let analytics = state
        .workflow
        .analytics(&PositionId::from(id))
        .await
        .map_err(|e| reject("Failed to load feedback analytics", e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} feedback records", analytics.total_feedback),
        analytics,
        None,
    )))
}
