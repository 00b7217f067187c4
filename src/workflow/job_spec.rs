// src/workflow/job_spec.rs
//! Job specification aggregate: drafts, edits, confirmation and status moves

use std::sync::Arc;
use tracing::info;

use super::heuristics::{apply_extraction, extract_fields};
use super::surface;
use crate::core::{Notifier, RecruitingStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    JobSpecId, JobSpecPatch, JobSpecStatus, JobSpecification, Position, PositionId,
};

pub struct JobSpecService {
    store: Arc<dyn RecruitingStore>,
    notifier: Arc<dyn Notifier>,
}

impl JobSpecService {
    pub fn new(store: Arc<dyn RecruitingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn create_draft(
        &self,
        position: &Position,
        raw_input: Option<&str>,
        audio_ref: Option<String>,
        document_ref: Option<String>,
    ) -> WorkflowResult<JobSpecification> {
        let mut spec =
            JobSpecification::draft(position.id.clone(), &position.title, &position.organization);
        spec.raw_input = raw_input
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        spec.audio_ref = audio_ref;
        spec.document_ref = document_ref;

        self.save(&spec).await?;
        info!("Created job specification {} for position {}", spec.id, position.id);
        Ok(spec)
    }

    pub async fn load(&self, id: &JobSpecId) -> WorkflowResult<JobSpecification> {
        surface(
            self.notifier.as_ref(),
            "Failed to load job specification",
            self.store.find_job_spec(id).await,
        )?
        .ok_or_else(|| WorkflowError::not_found(format!("job specification {}", id)))
    }

    pub async fn load_for_position(
        &self,
        position_id: &PositionId,
    ) -> WorkflowResult<Option<JobSpecification>> {
        surface(
            self.notifier.as_ref(),
            "Failed to load job specification",
            self.store.find_job_spec_for_position(position_id).await,
        )
    }

    pub async fn save(&self, spec: &JobSpecification) -> WorkflowResult<()> {
        surface(
            self.notifier.as_ref(),
            "Failed to save job specification",
            self.store.save_job_spec(spec).await,
        )
    }

    /// Draft → Confirmed. Refused while the title or organization is still a
    /// placeholder.
    pub async fn confirm(
        &self,
        id: &JobSpecId,
        notes: Option<&str>,
    ) -> WorkflowResult<JobSpecification> {
        let mut spec = self.load(id).await?;

        if let Some(reason) = spec.confirmation_blocker() {
            self.notifier.error("Cannot confirm job specification", &reason);
            return Err(WorkflowError::validation(reason));
        }
        if spec.status != JobSpecStatus::Draft {
            let reason = format!("Job specification is already {}", spec.status.as_str());
            self.notifier.error("Cannot confirm job specification", &reason);
            return Err(WorkflowError::validation(reason));
        }

        spec.status = JobSpecStatus::Confirmed;
        spec.confirmation_notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
        spec.updated_at = chrono::Utc::now();
        self.save(&spec).await?;
        info!("Confirmed job specification {}", id);
        Ok(spec)
    }

    /// Apply the same extraction the pipeline uses to `text`.
    pub async fn parse_from_input(
        &self,
        id: &JobSpecId,
        text: &str,
    ) -> WorkflowResult<JobSpecification> {
        let mut spec = self.load(id).await?;
        apply_extraction(&mut spec, &extract_fields(text));
        spec.raw_input = Some(text.trim().to_string());
        self.save(&spec).await?;
        Ok(spec)
    }

    /// Apply reviewer edits to the structured fields. Status is untouched and
    /// archived specifications are read-only.
    pub async fn update(
        &self,
        id: &JobSpecId,
        patch: &JobSpecPatch,
    ) -> WorkflowResult<JobSpecification> {
        let mut spec = self.load(id).await?;
        if spec.status == JobSpecStatus::Archived {
            return Err(WorkflowError::validation("Archived job specifications cannot be edited"));
        }
        spec.apply(patch);
        self.save(&spec).await?;
        info!("Updated job specification {}", id);
        Ok(spec)
    }

    /// Move the status forward. Backward or same-state moves are refused, and
    /// a draft only leaves Draft through the confirmation gate or by archiving.
    pub async fn advance(
        &self,
        id: &JobSpecId,
        next: JobSpecStatus,
    ) -> WorkflowResult<JobSpecification> {
        let mut spec = self.load(id).await?;
        if next == JobSpecStatus::Confirmed {
            if let Some(reason) = spec.confirmation_blocker() {
                return Err(WorkflowError::validation(reason));
            }
        }
        if !spec.status.can_advance_to(next) {
            return Err(WorkflowError::validation(format!(
                "Cannot move job specification from {} to {}",
                spec.status.as_str(),
                next.as_str()
            )));
        }
        spec.status = next;
        spec.updated_at = chrono::Utc::now();
        self.save(&spec).await?;
        info!("Job specification {} is now {}", id, next.as_str());
        Ok(spec)
    }
}
