// src/types/feedback.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::MatchStatus;
use super::{FeedbackId, JobSpecId, MatchId};

/// Immutable log entry of a reviewer decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub match_id: MatchId,
    pub job_spec_id: JobSpecId,
    pub decision: MatchStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        match_id: MatchId,
        job_spec_id: JobSpecId,
        decision: MatchStatus,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: FeedbackId::generate(),
            match_id,
            job_spec_id,
            decision,
            notes: notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalytics {
    pub total_feedback: usize,
    pub rejection_reasons: Vec<String>,
}

impl FeedbackAnalytics {
    /// Rejection reasons come from the notes of Rejected decisions only.
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        Self {
            total_feedback: records.len(),
            rejection_reasons: records
                .iter()
                .filter(|r| r.decision == MatchStatus::Rejected)
                .filter_map(|r| r.notes.clone())
                .collect(),
        }
    }
}
