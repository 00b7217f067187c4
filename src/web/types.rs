// src/web/types.rs - request bodies and the standard response envelope

use rocket::FromForm;
use rocket::fs::TempFile;
use rocket::serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::types::{MatchStatus, PositionStatus};
use crate::workflow::{MatchFilter, ViewMode};

// ===== Requests =====

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CreatePositionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub organization: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct UpdatePositionRequest {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub status: Option<PositionStatus>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ViewModeRequest {
    pub mode: ViewMode,
}

/// Multipart submission: free text plus an optional voice memo or document.
#[derive(FromForm)]
pub struct SubmitInputForm<'f> {
    #[field(default = String::new())]
    pub text: String,
    pub file: Option<TempFile<'f>>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct TextInputRequest {
    pub text: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ConfirmRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct MatchStatusRequest {
    pub status: MatchStatus,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct FeedbackRequest {
    pub match_id: String,
    pub decision: MatchStatus,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct MatchFilterRequest {
    pub min_score: Option<u8>,
    pub status: Option<MatchStatus>,
}

impl From<MatchFilterRequest> for MatchFilter {
    fn from(request: MatchFilterRequest) -> Self {
        Self {
            min_score: request.min_score,
            status: request.status,
        }
    }
}

// Request envelope with conversation_id support
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

// ===== Responses =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            next_actions: None,
            conversation_id,
        }
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        self.next_actions = Some(next_actions);
        self
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }

    pub fn from_workflow(error: &WorkflowError, conversation_id: Option<String>) -> Self {
        let suggestions = match error {
            WorkflowError::Persistence(_) => vec![
                "Try again in a few moments".to_string(),
                "Your local changes were not applied".to_string(),
            ],
            WorkflowError::Upload(_) => vec!["Retry the upload or continue with text only".to_string()],
            WorkflowError::Validation(_) => vec!["Review the request and try again".to_string()],
            WorkflowError::NotFound(_) => vec![
                "Refresh the position list".to_string(),
                "Check the identifier in the URL".to_string(),
            ],
            WorkflowError::Cancelled => vec!["Start processing again".to_string()],
        };
        Self::new(
            error.to_string(),
            error.code().to_string(),
            suggestions,
            conversation_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_envelope() {
        let error = WorkflowError::validation("Give the position a real title before confirming");
        let response = StandardErrorResponse::from_workflow(&error, Some("c-1".to_string()));
        assert_eq!(response.error_code, "VALIDATION_ERROR");
        assert!(!response.success);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["conversation_id"], "c-1");
    }

    #[test]
    fn test_data_response_omits_missing_conversation() {
        let response = DataResponse::success("ok".to_string(), vec![1, 2], None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "data");
        assert!(value.get("conversation_id").is_none());
    }

    #[test]
    fn test_feedback_request_parses_decision() {
        let request: StandardRequest<FeedbackRequest> = serde_json::from_str(
            r#"{"match_id":"m-1","decision":"rejected","notes":"bad culture fit"}"#,
        )
        .unwrap();
        assert_eq!(request.data.decision, MatchStatus::Rejected);
        assert_eq!(request.conversation_id(), None);
    }
}
