// src/web/handlers/conversation_handlers.rs

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::State;
use tokio::io::AsyncReadExt;
use tracing::info;

use super::{reject, ApiResult};
use crate::core::Notifier;
use crate::types::{
    CandidateMatch, ConversationTurn, JobSpecPatch, JobSpecification, PlanEdit, PositionId,
    SearchPlan,
};
use crate::web::types::{
    ActionResponse, ConfirmRequest, DataResponse, StandardRequest, SubmitInputForm,
    TextInputRequest, WithConversationId,
};
use crate::web::AppState;
use crate::workflow::{PipelineState, Upload};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ConversationView {
    pub has_started: bool,
    pub pipeline: PipelineState,
    pub plan: Option<SearchPlan>,
    pub turns: Vec<ConversationTurn>,
}

pub async fn conversation_handler(id: &str, state: &State<AppState>) -> Json<DataResponse<ConversationView>> {
    let id = PositionId::from(id);
    let turns = state.workflow.conversation(&id).await;
    let view = ConversationView {
        has_started: !turns.is_empty(),
        pipeline: state.workflow.pipeline_state(&id).await,
        plan: state.workflow.current_plan(&id).await,
        turns,
    };

    Json(DataResponse::success(
        format!("{} turns", view.turns.len()),
        view,
        None,
    ))
}

async fn read_upload(file: &TempFile<'_>) -> std::io::Result<Upload> {
    let file_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = file
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let reader = file.open().await?;
    tokio::pin!(reader);
    let mut bytes = Vec::with_capacity(file.len() as usize);
    reader.read_to_end(&mut bytes).await?;

    Ok(Upload {
        file_name,
        content_type,
        bytes,
    })
}

pub async fn submit_input_handler(
    id: &str,
    form: Form<SubmitInputForm<'_>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<ConversationTurn>>> {
    let upload = match form.file.as_ref().filter(|f| f.len() > 0) {
        Some(file) => match read_upload(file).await {
            Ok(upload) => Some(upload),
            Err(e) => {
                state.feed.warning(
                    "Upload failed",
                    &format!("Continuing without the attached file: {}", e),
                );
                None
            }
        },
        None => None,
    };

    let turns = state
        .workflow
        .submit_input(&PositionId::from(id), &form.text, upload)
        .await
        .map_err(|e| reject("Failed to submit input", e, None))?;

    info!("Accepted input for position {}", id);
    Ok(Json(DataResponse::success(
        "Processing started".to_string(),
        turns,
        None,
    )))
}

pub async fn refine_handler(
    id: &str,
    request: Json<StandardRequest<TextInputRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<ConversationTurn>> {
    let conversation_id = request.conversation_id();
    let turn = state
        .workflow
        .refine(&PositionId::from(id), &request.data.text)
        .await
        .map_err(|e| reject("Failed to refine plan", e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Refining the search plan".to_string(),
        turn,
        conversation_id,
    )))
}

pub async fn confirm_handler(
    id: &str,
    request: Json<StandardRequest<ConfirmRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CandidateMatch>>> {
    let conversation_id = request.conversation_id();
    let matches = state
        .workflow
        .confirm_plan(&PositionId::from(id), request.data.notes.as_deref())
        .await
        .map_err(|e| reject("Failed to confirm plan", e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        format!("Found {} candidates", matches.len()),
        matches,
        conversation_id,
    )))
}

pub async fn edit_plan_handler(
    id: &str,
    request: Json<StandardRequest<PlanEdit>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<SearchPlan>> {
    let conversation_id = request.conversation_id();
    let plan = state
        .workflow
        .edit_plan(&PositionId::from(id), &request.data)
        .await
        .map_err(|e| reject("Failed to edit plan", e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Search plan updated".to_string(),
        plan,
        conversation_id,
    )))
}

pub async fn edit_job_spec_handler(
    id: &str,
    request: Json<StandardRequest<JobSpecPatch>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobSpecification>> {
    let conversation_id = request.conversation_id();
    let spec = state
        .workflow
        .edit_job_spec(&PositionId::from(id), &request.data)
        .await
        .map_err(|e| reject("Failed to edit job specification", e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Job specification updated".to_string(),
        spec,
        conversation_id,
    )))
}

pub async fn reset_handler(id: &str, state: &State<AppState>) -> Json<ActionResponse> {
    let cancelled = state.workflow.reset_processing(&PositionId::from(id)).await;
    let message = if cancelled {
        "Processing reset"
    } else {
        "Nothing was processing"
    };
    Json(ActionResponse::success(
        message.to_string(),
        "reset".to_string(),
        None,
    ))
}

pub async fn clear_conversation_handler(id: &str, state: &State<AppState>) -> Json<ActionResponse> {
    let removed = state
        .workflow
        .clear_conversation(&PositionId::from(id))
        .await;
    Json(
        ActionResponse::success(
            format!("Removed {} turns", removed),
            "cleared".to_string(),
            None,
        )
        .with_next_actions(vec!["Describe the role again to restart".to_string()]),
    )
}
