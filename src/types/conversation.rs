// src/types/conversation.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::search_plan::SearchPlan;
use super::{JobSpecId, PositionId, TurnId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    UserInput,
    SystemConfirmation,
    SystemProgressStep,
    StructuredPreview,
    ResultSummary,
}

/// A file reference attached to a user turn after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: String,
    pub content_type: String,
    pub file_name: String,
}

impl Attachment {
    pub fn is_audio(&self) -> bool {
        self.content_type.starts_with("audio/")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnBody {
    UserInput {
        text: String,
        attachment: Option<Attachment>,
    },
    SystemConfirmation {
        text: String,
    },
    SystemProgressStep {
        step: usize,
        total: usize,
        text: String,
    },
    StructuredPreview {
        job_spec_id: JobSpecId,
        plan: SearchPlan,
    },
    ResultSummary {
        text: String,
        match_count: usize,
    },
}

impl TurnBody {
    pub fn kind(&self) -> TurnKind {
        match self {
            Self::UserInput { .. } => TurnKind::UserInput,
            Self::SystemConfirmation { .. } => TurnKind::SystemConfirmation,
            Self::SystemProgressStep { .. } => TurnKind::SystemProgressStep,
            Self::StructuredPreview { .. } => TurnKind::StructuredPreview,
            Self::ResultSummary { .. } => TurnKind::ResultSummary,
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::UserInput { text, .. }
            | Self::SystemConfirmation { text }
            | Self::SystemProgressStep { text, .. }
            | Self::ResultSummary { text, .. } => text.clone(),
            Self::StructuredPreview { plan, .. } => plan.job_summary.clone(),
        }
    }

    /// Only confirmation and progress turns carry a pending flag that may be
    /// settled after append.
    fn settles(&self) -> bool {
        matches!(
            self,
            Self::SystemConfirmation { .. } | Self::SystemProgressStep { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub position_id: PositionId,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
    #[serde(flatten)]
    pub body: TurnBody,
}

impl ConversationTurn {
    pub fn new(position_id: PositionId, body: TurnBody) -> Self {
        let pending = body.settles();
        Self {
            id: TurnId::generate(),
            position_id,
            created_at: Utc::now(),
            pending,
            body,
        }
    }

    pub fn kind(&self) -> TurnKind {
        self.body.kind()
    }

    pub fn user_input(position_id: PositionId, text: &str, attachment: Option<Attachment>) -> Self {
        Self::new(
            position_id,
            TurnBody::UserInput {
                text: text.to_string(),
                attachment,
            },
        )
    }

    pub fn confirmation(position_id: PositionId, text: &str) -> Self {
        Self::new(
            position_id,
            TurnBody::SystemConfirmation {
                text: text.to_string(),
            },
        )
    }

    pub fn progress(position_id: PositionId, step: usize, total: usize, text: &str) -> Self {
        Self::new(
            position_id,
            TurnBody::SystemProgressStep {
                step,
                total,
                text: text.to_string(),
            },
        )
    }

    pub fn preview(position_id: PositionId, job_spec_id: JobSpecId, plan: SearchPlan) -> Self {
        Self::new(position_id, TurnBody::StructuredPreview { job_spec_id, plan })
    }

    pub fn summary(position_id: PositionId, text: &str, match_count: usize) -> Self {
        Self::new(
            position_id,
            TurnBody::ResultSummary {
                text: text.to_string(),
                match_count,
            },
        )
    }

    /// Clear the pending flag. Returns false for turns that never pend.
    pub fn settle(&mut self) -> bool {
        if self.body.settles() {
            self.pending = false;
            true
        } else {
            false
        }
    }
}

/// Durable, write-only echo of a user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub position_id: PositionId,
    pub role: String,
    pub content: String,
    pub attachment_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatHistoryEntry {
    pub fn from_turn(turn: &ConversationTurn) -> Self {
        let attachment_path = match &turn.body {
            TurnBody::UserInput {
                attachment: Some(attachment),
                ..
            } => Some(attachment.path.clone()),
            _ => None,
        };
        let role = match turn.kind() {
            TurnKind::UserInput => "user",
            _ => "assistant",
        };
        Self {
            position_id: turn.position_id.clone(),
            role: role.to_string(),
            content: turn.body.display_text(),
            attachment_path,
            created_at: turn.created_at,
        }
    }
}
