// src/web/mod.rs - HTTP surface over the workflow

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, delete, get, options, patch, post, put, routes, Request, Response, State};
use std::sync::Arc;
use tracing::info;

use crate::core::{ConfigManager, Database, LocalBlobStore, Notification, NotificationFeed};
use crate::types::{
    CandidateMatch, ConversationTurn, FeedbackAnalytics, FeedbackRecord, JobSpecPatch,
    JobSpecification, PlanEdit, Position, PositionMetrics, SearchPlan,
};
use crate::workflow::{
    Collaborators, PositionSnapshot, SampleCandidateSource, ScriptedExtractor, Workflow,
};

/// Shared state handed to every route.
pub struct AppState {
    pub workflow: Workflow,
    pub feed: Arc<NotificationFeed>,
    pub database: Database,
}

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PUT, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// ===== Positions =====

#[get("/positions")]
pub async fn list_positions(state: &State<AppState>) -> ApiResult<DataResponse<Vec<Position>>> {
    handlers::list_positions_handler(state).await
}

#[post("/positions", data = "<request>")]
pub async fn create_position(
    request: Json<StandardRequest<CreatePositionRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionSnapshot>> {
    handlers::create_position_handler(request, state).await
}

#[patch("/positions/<id>", data = "<request>")]
pub async fn update_position(
    id: &str,
    request: Json<StandardRequest<UpdatePositionRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Position>> {
    handlers::update_position_handler(id, request, state).await
}

#[delete("/positions/<id>")]
pub async fn delete_position(id: &str, state: &State<AppState>) -> ApiResult<ActionResponse> {
    handlers::delete_position_handler(id, state).await
}

#[post("/positions/<id>/select")]
pub async fn select_position(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionSnapshot>> {
    handlers::select_position_handler(id, state).await
}

#[put("/positions/<id>/view-mode", data = "<request>")]
pub async fn set_view_mode(
    id: &str,
    request: Json<StandardRequest<ViewModeRequest>>,
    state: &State<AppState>,
) -> Json<ActionResponse> {
    handlers::set_view_mode_handler(id, request, state).await
}

#[get("/positions/<id>/metrics")]
pub async fn position_metrics(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<PositionMetrics>> {
    handlers::metrics_handler(id, state).await
}

// ===== Conversation =====

#[get("/positions/<id>/conversation")]
pub async fn conversation(
    id: &str,
    state: &State<AppState>,
) -> Json<DataResponse<ConversationView>> {
    handlers::conversation_handler(id, state).await
}

#[delete("/positions/<id>/conversation")]
pub async fn clear_conversation(id: &str, state: &State<AppState>) -> Json<ActionResponse> {
    handlers::clear_conversation_handler(id, state).await
}

#[post("/positions/<id>/input", data = "<form>")]
pub async fn submit_input(
    id: &str,
    form: Form<SubmitInputForm<'_>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<ConversationTurn>>> {
    handlers::submit_input_handler(id, form, state).await
}

#[post("/positions/<id>/refine", data = "<request>")]
pub async fn refine(
    id: &str,
    request: Json<StandardRequest<TextInputRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<ConversationTurn>> {
    handlers::refine_handler(id, request, state).await
}

#[post("/positions/<id>/confirm", data = "<request>")]
pub async fn confirm(
    id: &str,
    request: Json<StandardRequest<ConfirmRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CandidateMatch>>> {
    handlers::confirm_handler(id, request, state).await
}

#[post("/positions/<id>/reset")]
pub async fn reset(id: &str, state: &State<AppState>) -> Json<ActionResponse> {
    handlers::reset_handler(id, state).await
}

#[patch("/positions/<id>/plan", data = "<request>")]
pub async fn edit_plan(
    id: &str,
    request: Json<StandardRequest<PlanEdit>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<SearchPlan>> {
    handlers::edit_plan_handler(id, request, state).await
}

#[patch("/positions/<id>/job-spec", data = "<request>")]
pub async fn edit_job_spec(
    id: &str,
    request: Json<StandardRequest<JobSpecPatch>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobSpecification>> {
    handlers::edit_job_spec_handler(id, request, state).await
}

// ===== Candidates =====

#[get("/positions/<id>/matches")]
pub async fn matches(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CandidateMatch>>> {
    handlers::matches_handler(id, state).await
}

#[put("/matches/filter", data = "<request>")]
pub async fn set_match_filter(
    request: Json<StandardRequest<MatchFilterRequest>>,
    state: &State<AppState>,
) -> Json<ActionResponse> {
    handlers::set_match_filter_handler(request, state).await
}

#[put("/positions/<id>/matches/<match_id>/status", data = "<request>")]
pub async fn match_status(
    id: &str,
    match_id: &str,
    request: Json<StandardRequest<MatchStatusRequest>>,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    handlers::match_status_handler(id, match_id, request, state).await
}

#[post("/positions/<id>/feedback", data = "<request>")]
pub async fn feedback(
    id: &str,
    request: Json<StandardRequest<FeedbackRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<FeedbackRecord>> {
    handlers::feedback_handler(id, request, state).await
}

#[get("/positions/<id>/analytics")]
pub async fn analytics(
    id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<FeedbackAnalytics>> {
    handlers::analytics_handler(id, state).await
}

// ===== System =====

#[get("/notifications")]
pub async fn notifications(state: &State<AppState>) -> Json<DataResponse<Vec<Notification>>> {
    handlers::notifications_handler(state).await
}

#[get("/health")]
pub async fn health(state: &State<AppState>) -> ApiResult<TextResponse> {
    handlers::health_handler(state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Route not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the API path".to_string()],
        None,
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be understood".to_string(),
        "VALIDATION_ERROR".to_string(),
        vec!["Verify field names and enum values".to_string()],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

pub fn build_rocket(state: AppState, config: &ConfigManager) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    rocket::custom(figment)
        .attach(Cors)
        .manage(state)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                list_positions,
                create_position,
                update_position,
                delete_position,
                select_position,
                set_view_mode,
                position_metrics,
                conversation,
                clear_conversation,
                submit_input,
                refine,
                confirm,
                reset,
                edit_plan,
                edit_job_spec,
                matches,
                set_match_filter,
                match_status,
                feedback,
                analytics,
                notifications,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;

    let database = Database::new(&config.environment.database_path)
        .await
        .context("Failed to initialize database")?;
    let feed = Arc::new(NotificationFeed::new(config.pipeline.notification_capacity));
    let store = Arc::new(database.clone());

    let workflow = Workflow::new(
        Collaborators {
            store,
            blobs: Arc::new(LocalBlobStore::new(config.environment.upload_path.clone())),
            notifier: feed.clone(),
            extractor: Arc::new(ScriptedExtractor::new(&config.pipeline)),
            source: Arc::new(SampleCandidateSource),
        },
        config.pipeline.confirmation_message.clone(),
    );
    let positions = workflow.load_positions().await?;

    info!("Starting TalentFlow API server");
    info!("Environment: {}", config.environment.name);
    info!("Database: {}", config.environment.database_path.display());
    info!("Uploads: {}", config.environment.upload_path.display());
    info!("Loaded {} positions", positions.len());
    info!(
        "Server: http://{}:{}",
        config.server.address, config.server.port
    );

    let state = AppState {
        workflow,
        feed,
        database,
    };
    build_rocket(state, &config)
        .launch()
        .await
        .context("Rocket server failed")?;

    Ok(())
}
