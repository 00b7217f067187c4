pub mod candidate_handlers;
pub mod conversation_handlers;
pub mod position_handlers;
pub mod system_handlers;

pub use candidate_handlers::*;
pub use conversation_handlers::*;
pub use position_handlers::*;
pub use system_handlers::*;

use rocket::serde::json::Json;
use tracing::{error, warn};

use crate::error::WorkflowError;
use crate::web::types::StandardErrorResponse;

pub type ApiResult<T> = Result<Json<T>, Json<StandardErrorResponse>>;

/// Log a workflow failure and wrap it in the error envelope.
pub(crate) fn reject(
    context: &str,
    e: WorkflowError,
    conversation_id: Option<String>,
) -> Json<StandardErrorResponse> {
    match &e {
        WorkflowError::Validation(_) | WorkflowError::NotFound(_) => {
            warn!("{}: {}", context, e)
        }
        _ => error!("{}: {}", context, e),
    }
    Json(StandardErrorResponse::from_workflow(&e, conversation_id))
}
