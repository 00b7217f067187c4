// src/workflow/feedback.rs
//! Reviewer decisions on candidate matches

use std::sync::Arc;
use tracing::{error, info};

use super::surface;
use crate::core::{Notifier, RecruitingStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{FeedbackAnalytics, FeedbackRecord, JobSpecId, MatchId, MatchStatus};

pub struct FeedbackRecorder {
    store: Arc<dyn RecruitingStore>,
    notifier: Arc<dyn Notifier>,
}

impl FeedbackRecorder {
    pub fn new(store: Arc<dyn RecruitingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Append a feedback record, then move the match to `decision`.
    ///
    /// The two writes are not atomic. When the second one fails the record
    /// stays in place and the match keeps its old status; the caller gets a
    /// persistence error and the user an error notification.
    pub async fn submit(
        &self,
        match_id: &MatchId,
        job_spec_id: &JobSpecId,
        decision: MatchStatus,
        notes: Option<String>,
    ) -> WorkflowResult<FeedbackRecord> {
        if !decision.is_review_decision() {
            return Err(WorkflowError::validation(format!(
                "'{}' is not a review decision",
                decision.as_str()
            )));
        }

        let record = FeedbackRecord::new(match_id.clone(), job_spec_id.clone(), decision, notes);
        surface(
            self.notifier.as_ref(),
            "Failed to save feedback",
            self.store.insert_feedback(&record).await,
        )?;

        match self.store.update_match_status(match_id, decision).await {
            Ok(true) => {}
            Ok(false) => {
                error!("Feedback {} references unknown match {}", record.id, match_id);
                self.notifier
                    .error("Feedback saved", "The candidate match could not be found");
                return Err(WorkflowError::not_found(format!("candidate match {}", match_id)));
            }
            Err(e) => {
                error!("Feedback {} saved but match status update failed: {}", record.id, e);
                self.notifier.error(
                    "Feedback saved, status not updated",
                    &format!("The candidate still shows its previous status: {}", e),
                );
                return Err(e.into());
            }
        }

        info!("Recorded {} for match {}", decision.as_str(), match_id);
        Ok(record)
    }

    pub async fn analytics(&self, job_spec_id: &JobSpecId) -> WorkflowResult<FeedbackAnalytics> {
        let records = surface(
            self.notifier.as_ref(),
            "Failed to load feedback",
            self.store.list_feedback(job_spec_id).await,
        )?;
        Ok(FeedbackAnalytics::from_records(&records))
    }
}
