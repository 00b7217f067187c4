// src/workflow/orchestrator.rs
//! Binds positions, conversations, the processing pipeline, candidates and
//! feedback into one per-position workflow.
//!
//! All session state lives in a single `WorkflowState` behind one async
//! mutex. Pipeline runs are spawned tasks tagged with a generation number;
//! every write they make re-checks that generation under the lock, so a run
//! that was superseded by a switch, reset or new submission cannot touch the
//! log again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::candidates::{CandidateCollection, MatchFilter};
use super::conversation_log::ConversationLog;
use super::feedback::FeedbackRecorder;
use super::job_spec::JobSpecService;
use super::pipeline::{
    Extraction, ExtractionMode, ExtractionRequest, Extractor, PipelineState, ProgressSink,
};
use super::position_store::PositionStore;
use super::search::CandidateSource;
use super::surface;
use crate::core::{BlobStore, Notifier, RecruitingStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    Attachment, CandidateMatch, ChatHistoryEntry, ConversationTurn, FeedbackAnalytics,
    FeedbackRecord, JobSpecPatch, JobSpecStatus, JobSpecification, MatchId, MatchStatus,
    PlanEdit, Position, PositionId, PositionMetrics, PositionPatch, PositionStatus, SearchPlan,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Chat,
    Overview,
}

/// A file captured alongside a submission (voice memo or document).
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn bucket(&self) -> &'static str {
        if self.content_type.starts_with("audio/") {
            "audio"
        } else {
            "documents"
        }
    }
}

/// Everything a client needs to render a freshly selected position.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSnapshot {
    pub position: Position,
    pub view_mode: ViewMode,
    pub pipeline: PipelineState,
    pub turns: Vec<ConversationTurn>,
    pub job_spec: Option<JobSpecification>,
    pub plan: Option<SearchPlan>,
    pub matches: Vec<CandidateMatch>,
}

/// Injected collaborators.
pub struct Collaborators {
    pub store: Arc<dyn RecruitingStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub extractor: Arc<dyn Extractor>,
    pub source: Arc<dyn CandidateSource>,
}

struct PipelineRun {
    generation: u64,
    state: PipelineState,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct WorkflowState {
    log: ConversationLog,
    runs: HashMap<PositionId, PipelineRun>,
    next_generation: u64,
    active: Option<PositionId>,
    view_modes: HashMap<PositionId, ViewMode>,
    filter: MatchFilter,
    specs: HashMap<PositionId, JobSpecification>,
    plans: HashMap<PositionId, SearchPlan>,
    matches: HashMap<PositionId, Vec<CandidateMatch>>,
}

impl WorkflowState {
    fn pipeline_state(&self, position_id: &PositionId) -> PipelineState {
        self.runs
            .get(position_id)
            .map(|run| run.state)
            .unwrap_or(PipelineState::Idle)
    }

    fn ensure_current(&self, position_id: &PositionId, generation: u64) -> WorkflowResult<()> {
        match self.runs.get(position_id) {
            Some(run) if run.generation == generation => Ok(()),
            _ => Err(WorkflowError::Cancelled),
        }
    }

    /// Cancel whatever runs for the position and register a new generation.
    fn start_run(&mut self, position_id: &PositionId, state: PipelineState) -> u64 {
        self.cancel_run(position_id);
        self.next_generation += 1;
        let generation = self.next_generation;
        self.runs.insert(
            position_id.clone(),
            PipelineRun {
                generation,
                state,
                handle: None,
            },
        );
        generation
    }

    fn attach(&mut self, position_id: &PositionId, generation: u64, handle: JoinHandle<()>) {
        match self.runs.get_mut(position_id) {
            Some(run) if run.generation == generation => run.handle = Some(handle),
            _ => handle.abort(),
        }
    }

    fn set_state(&mut self, position_id: &PositionId, state: PipelineState) {
        if let Some(run) = self.runs.get_mut(position_id) {
            run.state = state;
        }
    }

    /// Drop the run, aborting its task. Pending turns are settled so nothing
    /// is left waiting on work that will never happen.
    fn cancel_run(&mut self, position_id: &PositionId) -> bool {
        match self.runs.remove(position_id) {
            Some(run) => {
                if let Some(handle) = run.handle {
                    handle.abort();
                }
                self.log.settle_pending(position_id);
                if run.state.is_in_flight() {
                    debug!("Cancelled processing run {} for {}", run.generation, position_id);
                }
                true
            }
            None => false,
        }
    }

    fn cancel_in_flight_except(&mut self, keep: &PositionId) {
        let stale: Vec<PositionId> = self
            .runs
            .iter()
            .filter(|(id, run)| *id != keep && run.state.is_in_flight())
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            self.cancel_run(&id);
        }
    }

    fn forget(&mut self, position_id: &PositionId) {
        self.cancel_run(position_id);
        self.log.clear(position_id);
        self.view_modes.remove(position_id);
        self.specs.remove(position_id);
        self.plans.remove(position_id);
        self.matches.remove(position_id);
        if self.active.as_ref() == Some(position_id) {
            self.active = None;
            self.filter = MatchFilter::default();
        }
    }

    fn initial_view_mode(&self, position_id: &PositionId) -> ViewMode {
        let has_matches = self
            .matches
            .get(position_id)
            .is_some_and(|m| !m.is_empty());
        if self.log.has_started(position_id) || has_matches {
            ViewMode::Overview
        } else {
            ViewMode::Chat
        }
    }

    fn append_user_turn(&mut self, turn: ConversationTurn, store: &Arc<dyn RecruitingStore>) {
        let entry = ChatHistoryEntry::from_turn(&turn);
        self.log.append(turn);

        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.append_chat_history(&entry).await {
                warn!("Chat history write for {} failed: {}", entry.position_id, e);
            }
        });
    }
}

struct Inner {
    positions: PositionStore,
    job_specs: JobSpecService,
    candidates: CandidateCollection,
    feedback: FeedbackRecorder,
    store: Arc<dyn RecruitingStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
    extractor: Arc<dyn Extractor>,
    source: Arc<dyn CandidateSource>,
    confirmation_message: String,
    state: Mutex<WorkflowState>,
}

#[derive(Clone)]
pub struct Workflow {
    inner: Arc<Inner>,
}

impl Workflow {
    pub fn new(collaborators: Collaborators, confirmation_message: impl Into<String>) -> Self {
        let Collaborators {
            store,
            blobs,
            notifier,
            extractor,
            source,
        } = collaborators;

        Self {
            inner: Arc::new(Inner {
                positions: PositionStore::new(store.clone(), notifier.clone()),
                job_specs: JobSpecService::new(store.clone(), notifier.clone()),
                candidates: CandidateCollection::new(store.clone(), notifier.clone()),
                feedback: FeedbackRecorder::new(store.clone(), notifier.clone()),
                store,
                blobs,
                notifier,
                extractor,
                source,
                confirmation_message: confirmation_message.into(),
                state: Mutex::new(WorkflowState::default()),
            }),
        }
    }

    pub fn job_specs(&self) -> &JobSpecService {
        &self.inner.job_specs
    }

    // ===== Positions =====

    pub async fn load_positions(&self) -> WorkflowResult<Vec<Position>> {
        self.inner.positions.refresh().await
    }

    pub async fn list_positions(&self) -> Vec<Position> {
        self.inner.positions.list().await
    }

    /// Create a position and make it the active one.
    pub async fn create_position(
        &self,
        title: &str,
        organization: &str,
    ) -> WorkflowResult<PositionSnapshot> {
        let id = self.inner.positions.create(title, organization).await?;
        self.select_position(&id).await
    }

    pub async fn update_position(
        &self,
        id: &PositionId,
        patch: &PositionPatch,
    ) -> WorkflowResult<Position> {
        if patch.is_empty() {
            return Err(WorkflowError::validation("Nothing to update"));
        }
        self.inner.positions.update(id, patch).await
    }

    /// Delete a position and cascade to its conversation, run and cached
    /// records. Chat history and the job specification are cleaned up on a
    /// best-effort basis.
    pub async fn delete_position(&self, id: &PositionId) -> WorkflowResult<()> {
        self.inner.positions.delete(id).await?;

        let spec = {
            let mut state = self.inner.state.lock().await;
            let spec = state.specs.get(id).cloned();
            state.forget(id);
            spec
        };

        if let Err(e) = self.inner.store.delete_chat_history(id).await {
            warn!("Failed to delete chat history for {}: {}", id, e);
        }

        let spec = match spec {
            Some(spec) => Some(spec),
            None => self.inner.store.find_job_spec_for_position(id).await.unwrap_or_else(|e| {
                warn!("Failed to look up job specification for {}: {}", id, e);
                None
            }),
        };
        if let Some(spec) = spec.filter(|s| s.status != JobSpecStatus::Archived) {
            if let Err(e) = self.inner.job_specs.advance(&spec.id, JobSpecStatus::Archived).await {
                warn!("Failed to archive job specification {}: {}", spec.id, e);
            }
        }
        Ok(())
    }

    /// Make `id` the active position. In-flight runs of every other position
    /// are cancelled and the transient match filter is cleared.
    pub async fn select_position(&self, id: &PositionId) -> WorkflowResult<PositionSnapshot> {
        let position = match self.inner.positions.get(id).await {
            Some(position) => position,
            None => self
                .inner
                .positions
                .refresh()
                .await?
                .into_iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| WorkflowError::not_found(format!("position {}", id)))?,
        };

        {
            let mut state = self.inner.state.lock().await;
            state.cancel_in_flight_except(id);
            if state.active.as_ref() != Some(id) {
                state.filter = MatchFilter::default();
            }
            state.active = Some(id.clone());
        }

        // Fan out: position list and job specification together, matches
        // once the specification id is known.
        let (refreshed, spec) = tokio::join!(
            self.inner.positions.refresh(),
            self.inner.job_specs.load_for_position(id)
        );
        let position = refreshed
            .ok()
            .and_then(|all| all.into_iter().find(|p| &p.id == id))
            .unwrap_or(position);
        let spec = spec.ok().flatten();
        let matches = match &spec {
            Some(spec) => self.inner.candidates.load_for_job_spec(&spec.id).await.ok(),
            None => Some(Vec::new()),
        };

        let mut state = self.inner.state.lock().await;
        if let Some(spec) = spec {
            state.specs.insert(id.clone(), spec);
        }
        if let Some(matches) = matches {
            state.matches.insert(id.clone(), matches);
        }
        let view_mode = state.initial_view_mode(id);
        state.view_modes.insert(id.clone(), view_mode);
        info!("Selected position {} in {:?} mode", id, view_mode);

        Ok(PositionSnapshot {
            view_mode,
            pipeline: state.pipeline_state(id),
            turns: state.log.get(id).to_vec(),
            job_spec: state.specs.get(id).cloned(),
            plan: state.plans.get(id).cloned(),
            matches: state.matches.get(id).cloned().unwrap_or_default(),
            position,
        })
    }

    pub async fn active_position(&self) -> Option<PositionId> {
        self.inner.state.lock().await.active.clone()
    }

    pub async fn view_mode(&self, id: &PositionId) -> ViewMode {
        let state = self.inner.state.lock().await;
        state
            .view_modes
            .get(id)
            .copied()
            .unwrap_or_else(|| state.initial_view_mode(id))
    }

    pub async fn set_view_mode(&self, id: &PositionId, mode: ViewMode) {
        self.inner.state.lock().await.view_modes.insert(id.clone(), mode);
    }

    // ===== Conversation =====

    pub async fn conversation(&self, id: &PositionId) -> Vec<ConversationTurn> {
        self.inner.state.lock().await.log.get(id).to_vec()
    }

    pub async fn has_started(&self, id: &PositionId) -> bool {
        self.inner.state.lock().await.log.has_started(id)
    }

    pub async fn pipeline_state(&self, id: &PositionId) -> PipelineState {
        self.inner.state.lock().await.pipeline_state(id)
    }

    pub async fn job_spec(&self, id: &PositionId) -> Option<JobSpecification> {
        self.inner.state.lock().await.specs.get(id).cloned()
    }

    pub async fn current_plan(&self, id: &PositionId) -> Option<SearchPlan> {
        self.inner.state.lock().await.plans.get(id).cloned()
    }

    /// Edit the position's job specification. Refused while a run is in
    /// flight so the edit cannot be overwritten by the run's result.
    pub async fn edit_job_spec(
        &self,
        id: &PositionId,
        patch: &JobSpecPatch,
    ) -> WorkflowResult<JobSpecification> {
        if self.pipeline_state(id).await.is_in_flight() {
            return Err(WorkflowError::validation(
                "Wait for processing to finish before editing the job specification",
            ));
        }
        let spec = self.require_spec(id).await?;
        let spec = self.inner.job_specs.update(&spec.id, patch).await?;
        self.inner
            .state
            .lock()
            .await
            .specs
            .insert(id.clone(), spec.clone());
        Ok(spec)
    }

    /// Submit free-form input, optionally with a file, and start a
    /// processing run. Returns the user and confirmation turns.
    pub async fn submit_input(
        &self,
        id: &PositionId,
        text: &str,
        upload: Option<Upload>,
    ) -> WorkflowResult<Vec<ConversationTurn>> {
        let text = text.trim();
        if text.is_empty() && upload.is_none() {
            return Err(WorkflowError::validation("Describe the role or attach a file"));
        }
        let position = self
            .inner
            .positions
            .get(id)
            .await
            .ok_or_else(|| WorkflowError::not_found(format!("position {}", id)))?;

        let attachment = match upload {
            Some(upload) => self.store_upload(upload).await,
            None => None,
        };

        let spec = self.draft_for(&position, text, attachment.as_ref()).await?;

        let turns = {
            let mut state = self.inner.state.lock().await;
            let user = ConversationTurn::user_input(id.clone(), text, attachment);
            let confirmation =
                ConversationTurn::confirmation(id.clone(), &self.inner.confirmation_message);
            state.append_user_turn(user.clone(), &self.inner.store);
            state.log.append(confirmation.clone());
            state.specs.insert(id.clone(), spec.clone());

            let generation = state.start_run(id, PipelineState::Confirming);
            let request = ExtractionRequest {
                spec,
                text: text.to_string(),
                mode: ExtractionMode::Initial,
            };
            let handle = tokio::spawn(self.clone().run_pipeline(id.clone(), generation, request));
            state.attach(id, generation, handle);
            vec![user, confirmation]
        };
        info!("Started processing for position {}", id);

        if position.status == PositionStatus::Draft {
            if let Err(e) = self
                .inner
                .positions
                .update(id, &PositionPatch::status(PositionStatus::InProgress))
                .await
            {
                warn!("Failed to mark position {} in progress: {}", id, e);
            }
        }
        Ok(turns)
    }

    /// Ask for changes to the current preview. The pipeline re-enters
    /// `Producing` and appends a replacement preview.
    pub async fn refine(&self, id: &PositionId, text: &str) -> WorkflowResult<ConversationTurn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::validation("Describe what should change"));
        }

        let mut state = self.inner.state.lock().await;
        if state.pipeline_state(id) != PipelineState::AwaitingConfirmation {
            return Err(WorkflowError::validation("There is no search plan to refine yet"));
        }
        let (spec, previous) = match (state.specs.get(id), state.plans.get(id)) {
            (Some(spec), Some(plan)) => (spec.clone(), plan.clone()),
            _ => return Err(WorkflowError::not_found("search plan")),
        };

        let user = ConversationTurn::user_input(id.clone(), text, None);
        state.append_user_turn(user.clone(), &self.inner.store);

        let generation = state.start_run(id, PipelineState::Producing);
        let request = ExtractionRequest {
            spec,
            text: text.to_string(),
            mode: ExtractionMode::Refine { previous },
        };
        let handle = tokio::spawn(self.clone().run_pipeline(id.clone(), generation, request));
        state.attach(id, generation, handle);
        Ok(user)
    }

    /// Stop any run for the position and settle its pending turns.
    pub async fn reset_processing(&self, id: &PositionId) -> bool {
        let mut state = self.inner.state.lock().await;
        let cancelled = state.cancel_run(id);
        if cancelled {
            info!("Reset processing for position {}", id);
        }
        cancelled
    }

    /// Reset processing and drop the position's conversation.
    pub async fn clear_conversation(&self, id: &PositionId) -> usize {
        let removed = {
            let mut state = self.inner.state.lock().await;
            state.cancel_run(id);
            state.plans.remove(id);
            state.log.clear(id)
        };
        if let Err(e) = self.inner.store.delete_chat_history(id).await {
            warn!("Failed to delete chat history for {}: {}", id, e);
        }
        removed
    }

    pub async fn edit_plan(&self, id: &PositionId, edit: &PlanEdit) -> WorkflowResult<SearchPlan> {
        let mut state = self.inner.state.lock().await;
        if state.pipeline_state(id) != PipelineState::AwaitingConfirmation {
            return Err(WorkflowError::validation(
                "The search plan can only be edited while it awaits confirmation",
            ));
        }
        let plan = state
            .plans
            .get(id)
            .ok_or_else(|| WorkflowError::not_found("search plan"))?
            .edited(edit);
        if !plan.weights.is_balanced() {
            self.inner.notifier.warning(
                "Weights do not add up",
                &format!("Scoring weights total {}%", plan.weights.total()),
            );
        }
        state.plans.insert(id.clone(), plan.clone());
        Ok(plan)
    }

    /// Confirm the previewed plan and run the candidate search. Retrying
    /// after a failed search skips the steps that already happened.
    pub async fn confirm_plan(
        &self,
        id: &PositionId,
        notes: Option<&str>,
    ) -> WorkflowResult<Vec<CandidateMatch>> {
        let (spec, plan, generation) = {
            let mut state = self.inner.state.lock().await;
            if state.pipeline_state(id) != PipelineState::AwaitingConfirmation {
                return Err(WorkflowError::validation("There is no search plan to confirm"));
            }
            let (spec, plan) = match (state.specs.get(id), state.plans.get(id)) {
                (Some(spec), Some(plan)) => (spec.clone(), plan.clone()),
                _ => return Err(WorkflowError::not_found("search plan")),
            };
            let generation = state.runs.get(id).map(|r| r.generation).unwrap_or_default();
            (spec, plan, generation)
        };

        let mut spec = spec;
        if spec.status == JobSpecStatus::Draft {
            spec = self.inner.job_specs.confirm(&spec.id, notes).await?;
        }
        if spec.status < JobSpecStatus::Searching {
            spec = self
                .inner
                .job_specs
                .advance(&spec.id, JobSpecStatus::Searching)
                .await?;
        }
        {
            let mut state = self.inner.state.lock().await;
            state.specs.insert(id.clone(), spec.clone());
            if state.ensure_current(id, generation).is_ok() {
                state.set_state(id, PipelineState::Searching);
            }
        }

        let result = match self.inner.source.search(&spec, &plan).await {
            Ok(drafts) => self.inner.candidates.ingest(&spec.id, drafts).await,
            Err(e) => {
                self.inner.notifier.error("Candidate search failed", &e.to_string());
                Err(e)
            }
        };
        let matches = match result {
            Ok(matches) => matches,
            Err(e) => {
                let mut state = self.inner.state.lock().await;
                if state.ensure_current(id, generation).is_ok() {
                    state.set_state(id, PipelineState::AwaitingConfirmation);
                }
                return Err(e);
            }
        };

        let spec = self
            .inner
            .job_specs
            .advance(&spec.id, JobSpecStatus::Completed)
            .await?;
        if let Err(e) = self
            .inner
            .positions
            .update(id, &PositionPatch::status(PositionStatus::Completed))
            .await
        {
            warn!("Failed to mark position {} completed: {}", id, e);
        }

        let mut state = self.inner.state.lock().await;
        state.specs.insert(id.clone(), spec.clone());
        state.matches.insert(id.clone(), matches.clone());
        if state.ensure_current(id, generation).is_ok() {
            state.runs.remove(id);
            state.log.append(ConversationTurn::summary(
                id.clone(),
                &format!("Found {} candidates for {}", matches.len(), spec.title),
                matches.len(),
            ));
            state.view_modes.insert(id.clone(), ViewMode::Overview);
        }
        info!("Search for {} returned {} candidates", spec.id, matches.len());
        Ok(matches)
    }

    // ===== Candidates =====

    /// Ranked matches for the position, narrowed by the transient filter
    /// when the position is the active one.
    pub async fn matches(&self, id: &PositionId) -> WorkflowResult<Vec<CandidateMatch>> {
        let matches = self.load_matches(id).await?;
        let state = self.inner.state.lock().await;
        if state.active.as_ref() == Some(id) && !state.filter.is_empty() {
            Ok(state.filter.apply(&matches))
        } else {
            Ok(matches)
        }
    }

    pub async fn set_match_filter(&self, filter: MatchFilter) {
        self.inner.state.lock().await.filter = filter;
    }

    /// Record a reviewer transition on one of the position's matches.
    /// Matches never return to Pending.
    pub async fn update_match_status(
        &self,
        id: &PositionId,
        match_id: &MatchId,
        status: MatchStatus,
    ) -> WorkflowResult<()> {
        if status == MatchStatus::Pending {
            return Err(WorkflowError::validation("Candidates cannot be moved back to pending"));
        }
        self.find_match(id, match_id).await?;
        self.inner.candidates.update_status(match_id, status).await?;
        self.patch_cached_match(id, match_id, status).await;
        Ok(())
    }

    pub async fn submit_feedback(
        &self,
        id: &PositionId,
        match_id: &MatchId,
        decision: MatchStatus,
        notes: Option<String>,
    ) -> WorkflowResult<FeedbackRecord> {
        let spec = self.require_spec(id).await?;
        let current = self.find_match(id, match_id).await?;
        if matches!(current.status, MatchStatus::Interviewed | MatchStatus::Hired) {
            return Err(WorkflowError::validation(format!(
                "Candidate is already {}",
                current.status.as_str()
            )));
        }

        let record = self
            .inner
            .feedback
            .submit(match_id, &spec.id, decision, notes)
            .await?;
        self.patch_cached_match(id, match_id, decision).await;
        Ok(record)
    }

    pub async fn analytics(&self, id: &PositionId) -> WorkflowResult<FeedbackAnalytics> {
        let spec = self.require_spec(id).await?;
        self.inner.feedback.analytics(&spec.id).await
    }

    pub async fn metrics(&self, id: &PositionId) -> WorkflowResult<PositionMetrics> {
        let matches = self.load_matches(id).await?;
        let total_feedback = match self.spec_for(id).await? {
            Some(spec) => surface(
                self.inner.notifier.as_ref(),
                "Failed to load feedback",
                self.inner.store.list_feedback(&spec.id).await,
            )?
            .len(),
            None => 0,
        };
        Ok(PositionMetrics::compute(&matches, total_feedback))
    }

    // ===== Internals =====

    async fn store_upload(&self, upload: Upload) -> Option<Attachment> {
        let bucket = upload.bucket();
        match self
            .inner
            .blobs
            .upload(bucket, &upload.file_name, &upload.bytes)
            .await
        {
            Ok(path) => Some(Attachment {
                path,
                content_type: upload.content_type,
                file_name: upload.file_name,
            }),
            Err(e) => {
                self.inner.notifier.warning(
                    "Upload failed",
                    &format!("Continuing without {}: {}", upload.file_name, e),
                );
                None
            }
        }
    }

    /// The position's draft specification, created on first input.
    async fn draft_for(
        &self,
        position: &Position,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> WorkflowResult<JobSpecification> {
        let audio_ref = attachment.filter(|a| a.is_audio()).map(|a| a.path.clone());
        let document_ref = attachment.filter(|a| !a.is_audio()).map(|a| a.path.clone());

        match self.spec_for(&position.id).await? {
            None => {
                self.inner
                    .job_specs
                    .create_draft(position, Some(text), audio_ref, document_ref)
                    .await
            }
            Some(mut spec) if spec.status == JobSpecStatus::Draft => {
                spec.raw_input = Some(text.to_string());
                spec.audio_ref = audio_ref.or(spec.audio_ref);
                spec.document_ref = document_ref.or(spec.document_ref);
                spec.updated_at = chrono::Utc::now();
                self.inner.job_specs.save(&spec).await?;
                Ok(spec)
            }
            Some(spec) => Err(WorkflowError::validation(format!(
                "The job specification is already {}; refine the plan instead",
                spec.status.as_str()
            ))),
        }
    }

    async fn spec_for(&self, id: &PositionId) -> WorkflowResult<Option<JobSpecification>> {
        if let Some(spec) = self.inner.state.lock().await.specs.get(id).cloned() {
            return Ok(Some(spec));
        }
        let spec = self.inner.job_specs.load_for_position(id).await?;
        if let Some(spec) = &spec {
            self.inner
                .state
                .lock()
                .await
                .specs
                .insert(id.clone(), spec.clone());
        }
        Ok(spec)
    }

    async fn require_spec(&self, id: &PositionId) -> WorkflowResult<JobSpecification> {
        self.spec_for(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("job specification for position {}", id)))
    }

    async fn load_matches(&self, id: &PositionId) -> WorkflowResult<Vec<CandidateMatch>> {
        let Some(spec) = self.spec_for(id).await? else {
            return Ok(Vec::new());
        };
        let matches = self.inner.candidates.load_for_job_spec(&spec.id).await?;
        self.inner
            .state
            .lock()
            .await
            .matches
            .insert(id.clone(), matches.clone());
        Ok(matches)
    }

    /// The match, provided it belongs to the position's job specification.
    async fn find_match(
        &self,
        id: &PositionId,
        match_id: &MatchId,
    ) -> WorkflowResult<CandidateMatch> {
        self.load_matches(id)
            .await?
            .into_iter()
            .find(|m| &m.id == match_id)
            .ok_or_else(|| {
                WorkflowError::not_found(format!("candidate match {} for position {}", match_id, id))
            })
    }

    async fn patch_cached_match(&self, id: &PositionId, match_id: &MatchId, status: MatchStatus) {
        let mut state = self.inner.state.lock().await;
        if let Some(candidate) = state
            .matches
            .get_mut(id)
            .and_then(|all| all.iter_mut().find(|m| &m.id == match_id))
        {
            candidate.status = status;
        }
    }

    async fn run_pipeline(self, id: PositionId, generation: u64, request: ExtractionRequest) {
        let progress = RunProgress {
            workflow: self.clone(),
            position_id: id.clone(),
            generation,
        };
        let outcome = match self.inner.extractor.extract(request, &progress).await {
            Ok(extraction) => self.finish_run(&id, generation, extraction).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(WorkflowError::Cancelled) => {
                debug!("Processing run {} for {} was superseded", generation, id);
            }
            Err(e) => {
                let mut state = self.inner.state.lock().await;
                if state.ensure_current(&id, generation).is_ok() {
                    state.log.settle_pending(&id);
                    let fallback = if state.plans.contains_key(&id) {
                        PipelineState::AwaitingConfirmation
                    } else {
                        PipelineState::Idle
                    };
                    state.set_state(&id, fallback);
                }
                warn!("Processing run {} for {} failed: {}", generation, id, e);
            }
        }
    }

    /// Persist the extracted specification and append the preview. Nothing
    /// is applied locally when the save fails.
    async fn finish_run(
        &self,
        id: &PositionId,
        generation: u64,
        extraction: Extraction,
    ) -> WorkflowResult<()> {
        let Extraction { spec, plan } = extraction;
        self.inner.state.lock().await.ensure_current(id, generation)?;

        // The store call runs without the workflow lock held
        self.inner.job_specs.save(&spec).await?;

        let title = {
            let mut state = self.inner.state.lock().await;
            state.ensure_current(id, generation)?;
            let title_changed = state
                .specs
                .get(id)
                .is_some_and(|previous| previous.title != spec.title);
            let title = title_changed.then(|| spec.title.clone());

            state.log.settle_pending(id);
            state
                .log
                .append(ConversationTurn::preview(id.clone(), spec.id.clone(), plan.clone()));
            state.specs.insert(id.clone(), spec);
            state.plans.insert(id.clone(), plan);
            state.set_state(id, PipelineState::AwaitingConfirmation);
            title
        };
        info!("Search plan ready for position {}", id);

        if let Some(title) = title {
            let patch = PositionPatch {
                title: Some(title),
                ..PositionPatch::default()
            };
            if let Err(e) = self.inner.positions.update(id, &patch).await {
                warn!("Failed to rename position {}: {}", id, e);
            }
        }
        Ok(())
    }
}

/// Progress writer bound to one run of one position.
struct RunProgress {
    workflow: Workflow,
    position_id: PositionId,
    generation: u64,
}

#[async_trait]
impl ProgressSink for RunProgress {
    async fn announce(&self, step: usize, total: usize, message: &str) -> WorkflowResult<()> {
        let mut state = self.workflow.inner.state.lock().await;
        state.ensure_current(&self.position_id, self.generation)?;
        state.log.settle_pending(&self.position_id);
        state.log.append(ConversationTurn::progress(
            self.position_id.clone(),
            step,
            total,
            message,
        ));
        state.set_state(&self.position_id, PipelineState::Announcing { step, total });
        Ok(())
    }

    async fn producing(&self) -> WorkflowResult<()> {
        let mut state = self.workflow.inner.state.lock().await;
        state.ensure_current(&self.position_id, self.generation)?;
        state.set_state(&self.position_id, PipelineState::Producing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryStore, NotificationFeed, Operation, PipelineConfig};
    use crate::types::TurnKind;
    use crate::workflow::{SampleCandidateSource, ScriptedExtractor};
    use std::time::Duration;

    fn workflow() -> (Workflow, Arc<MemoryStore>, Arc<NotificationFeed>) {
        let store = Arc::new(MemoryStore::new());
        let feed = Arc::new(NotificationFeed::new(20));
        let config = PipelineConfig::default();
        let workflow = Workflow::new(
            Collaborators {
                store: store.clone(),
                blobs: store.clone(),
                notifier: feed.clone(),
                extractor: Arc::new(ScriptedExtractor::new(&config)),
                source: Arc::new(SampleCandidateSource),
            },
            config.confirmation_message,
        );
        (workflow, store, feed)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_position_opens_in_chat() {
        let (workflow, _, _) = workflow();
        let snapshot = workflow.create_position("Engineer", "Acme").await.unwrap();
        assert_eq!(snapshot.view_mode, ViewMode::Chat);
        assert_eq!(snapshot.pipeline, PipelineState::Idle);
        assert_eq!(
            workflow.active_position().await,
            Some(snapshot.position.id.clone())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_settles_and_stops() {
        let (workflow, _, _) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        workflow.submit_input(&id, "backend developer", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            workflow.pipeline_state(&id).await,
            PipelineState::Announcing { step: 1, total: 4 }
        );

        assert!(workflow.reset_processing(&id).await);
        tokio::time::sleep(Duration::from_secs(30)).await;

        let turns = workflow.conversation(&id).await;
        assert_eq!(turns.len(), 3);
        assert!(turns.iter().all(|t| !t.pending));
        assert_eq!(workflow.pipeline_state(&id).await, PipelineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_during_pipeline_keeps_turns() {
        let (workflow, store, feed) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        workflow.submit_input(&id, "backend developer", None).await.unwrap();
        store.fail(Operation::SaveJobSpec);
        tokio::time::sleep(Duration::from_secs(30)).await;

        let turns = workflow.conversation(&id).await;
        assert_eq!(turns.len(), 6);
        assert!(turns.iter().all(|t| t.kind() != TurnKind::StructuredPreview));
        assert!(turns.iter().all(|t| !t.pending));
        assert_eq!(workflow.pipeline_state(&id).await, PipelineState::Idle);
        assert!(workflow.current_plan(&id).await.is_none());
        assert!(feed
            .recent()
            .iter()
            .any(|n| n.title == "Failed to save job specification"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_status_failure_does_not_stop_the_run() {
        let (workflow, store, _) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        store.fail(Operation::UpdatePosition);

        workflow.submit_input(&id, "backend developer", None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(
            workflow.pipeline_state(&id).await,
            PipelineState::AwaitingConfirmation
        );
        let position = workflow
            .list_positions()
            .await
            .into_iter()
            .find(|p| p.id == id)
            .unwrap();
        assert_eq!(position.status, PositionStatus::Draft);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_degrades_to_plain_turn() {
        let (workflow, store, feed) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        store.fail(Operation::Upload);

        let upload = Upload {
            file_name: "memo.webm".to_string(),
            content_type: "audio/webm".to_string(),
            bytes: vec![1, 2, 3],
        };
        let turns = workflow
            .submit_input(&id, "senior engineer", Some(upload))
            .await
            .unwrap();
        match &turns[0].body {
            crate::types::TurnBody::UserInput { attachment, .. } => assert!(attachment.is_none()),
            other => panic!("unexpected turn {:?}", other),
        }
        assert_eq!(feed.recent().last().unwrap().title, "Upload failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_upload_is_attached() {
        let (workflow, store, _) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        let upload = Upload {
            file_name: "memo.webm".to_string(),
            content_type: "audio/webm".to_string(),
            bytes: vec![1, 2, 3],
        };
        workflow.submit_input(&id, "", Some(upload)).await.unwrap();

        assert_eq!(store.blob("audio/memo.webm"), Some(vec![1, 2, 3]));
        let spec = workflow.job_spec(&id).await.unwrap();
        assert_eq!(spec.audio_ref.as_deref(), Some("audio/memo.webm"));
        assert_eq!(spec.document_ref, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_submission_is_refused() {
        let (workflow, _, _) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        let err = workflow.submit_input(&id, "   ", None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(!workflow.has_started(&id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_plan_flags_unbalanced_weights() {
        let (workflow, _, feed) = workflow();
        let id = workflow
            .create_position("Engineer", "Acme")
            .await
            .unwrap()
            .position
            .id;
        assert!(workflow.edit_plan(&id, &PlanEdit::default()).await.is_err());

        workflow.submit_input(&id, "senior engineer", None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let plan = workflow
            .edit_plan(
                &id,
                &PlanEdit {
                    weights: Some(crate::types::SearchWeights::new(70, 30, 20)),
                    ..PlanEdit::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(plan.weights.total(), 120);
        assert_eq!(workflow.current_plan(&id).await, Some(plan));
        assert_eq!(feed.recent().last().unwrap().title, "Weights do not add up");
    }
}
