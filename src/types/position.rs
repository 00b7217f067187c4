// src/types/position.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::PositionId;

/// Title given to positions created without one.
pub const PLACEHOLDER_TITLE: &str = "New Position";
/// Organization given to positions created without one.
pub const PLACEHOLDER_ORGANIZATION: &str = "New Organization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Draft,
    InProgress,
    Completed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for PositionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown position status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    pub organization: String,
    pub status: PositionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn new(title: &str, organization: &str) -> Self {
        let now = Utc::now();
        Self {
            id: PositionId::generate(),
            title: non_blank_or(title, PLACEHOLDER_TITLE),
            organization: non_blank_or(organization, PLACEHOLDER_ORGANIZATION),
            status: PositionStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, returning the patched copy.
    pub fn patched(&self, patch: &PositionPatch) -> Self {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = non_blank_or(title, PLACEHOLDER_TITLE);
        }
        if let Some(organization) = &patch.organization {
            next.organization = non_blank_or(organization, PLACEHOLDER_ORGANIZATION);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next.updated_at = Utc::now();
        next
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionPatch {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub status: Option<PositionStatus>,
}

impl PositionPatch {
    pub fn status(status: PositionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.organization.is_none() && self.status.is_none()
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
