// End-to-end workflow scenarios against the in-memory store, on a paused clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use talent_workflow::core::{
    MemoryStore, NotificationFeed, Operation, PipelineConfig, RecruitingStore,
};
use talent_workflow::error::{StoreResult, WorkflowError, WorkflowResult};
use talent_workflow::types::{
    CandidateDraft, CandidateMatch, ChatHistoryEntry, DiscoveryChannel, FeedbackRecord, JobSpecId,
    JobSpecPatch, JobSpecStatus, JobSpecification, MatchId, MatchStatus, PlanEdit, Position,
    PositionId, PositionStatus, SearchPlan, SubScores, TurnBody, TurnKind,
};
use talent_workflow::workflow::{
    CandidateSource, Collaborators, PipelineState, SampleCandidateSource, ScriptedExtractor,
    ViewMode, Workflow,
};

const PIPELINE_DONE: Duration = Duration::from_secs(7);

struct Harness {
    workflow: Workflow,
    store: Arc<MemoryStore>,
    feed: Arc<NotificationFeed>,
}

fn harness_with(source: Arc<dyn CandidateSource>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let feed = Arc::new(NotificationFeed::new(50));
    let config = PipelineConfig::default();
    let workflow = Workflow::new(
        Collaborators {
            store: store.clone(),
            blobs: store.clone(),
            notifier: feed.clone(),
            extractor: Arc::new(ScriptedExtractor::new(&config)),
            source,
        },
        config.confirmation_message,
    );
    Harness {
        workflow,
        store,
        feed,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(SampleCandidateSource))
}

async fn open(workflow: &Workflow, title: &str, organization: &str) -> PositionId {
    workflow
        .create_position(title, organization)
        .await
        .unwrap()
        .position
        .id
}

/// Two candidates with hand-picked sub-scores.
struct FixedSource;

#[async_trait]
impl CandidateSource for FixedSource {
    async fn search(
        &self,
        spec: &JobSpecification,
        _plan: &SearchPlan,
    ) -> WorkflowResult<Vec<CandidateDraft>> {
        let draft = |n: usize, name: &str, scores: SubScores| CandidateDraft {
            candidate_ref: format!("{}-{}", spec.id, n),
            display_name: name.to_string(),
            current_title: None,
            current_company: None,
            channel: DiscoveryChannel::Referral,
            scores,
            score_breakdown: None,
        };
        Ok(vec![
            draft(1, "Average", SubScores::new(80, 60, 90, 70)),
            draft(2, "Strong", SubScores::new(95, 90, 85, 90)),
        ])
    }
}

#[tokio::test(start_paused = true)]
async fn test_senior_react_request_produces_preview() {
    let h = harness();
    let id = open(&h.workflow, "", "Acme").await;

    let turns = h
        .workflow
        .submit_input(
            &id,
            "Looking for a senior engineer with React experience",
            None,
        )
        .await
        .unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].kind(), TurnKind::SystemConfirmation);
    assert!(turns[1].pending);
    assert_eq!(h.workflow.pipeline_state(&id).await, PipelineState::Confirming);

    // Each progress step settles everything that came before it. Checks land
    // 50ms after each scheduled step.
    for (step, delay) in [(1, 1050), (2, 1500), (3, 1500), (4, 1000)] {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let log = h.workflow.conversation(&id).await;
        assert_eq!(log.len(), 2 + step);
        assert!(log[..log.len() - 1].iter().all(|t| !t.pending));
        assert!(log.last().unwrap().pending);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    let log = h.workflow.conversation(&id).await;
    let kinds: Vec<TurnKind> = log.iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TurnKind::UserInput,
            TurnKind::SystemConfirmation,
            TurnKind::SystemProgressStep,
            TurnKind::SystemProgressStep,
            TurnKind::SystemProgressStep,
            TurnKind::SystemProgressStep,
            TurnKind::StructuredPreview,
        ]
    );
    assert!(log.iter().all(|t| !t.pending));
    assert_eq!(
        h.workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );

    let plan = h.workflow.current_plan(&id).await.unwrap();
    assert!(plan.target_companies.contains(&"Google".to_string()));
    assert!(plan.target_companies.contains(&"Meta".to_string()));
    assert!(plan.filters.skills.contains(&"React".to_string()));
    assert_eq!(plan.filters.experience.min_years, 5);

    let spec = h.workflow.job_spec(&id).await.unwrap();
    assert_eq!(spec.title, "Senior Software Engineer");
    let position = h
        .workflow
        .list_positions()
        .await
        .into_iter()
        .find(|p| p.id == id)
        .unwrap();
    assert_eq!(position.title, "Senior Software Engineer");
    assert_eq!(position.status, PositionStatus::InProgress);
    assert_eq!(h.store.chat_history(&id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_startup_refinement_replaces_companies() {
    let h = harness();
    let id = open(&h.workflow, "Platform Engineer", "Acme").await;
    h.workflow
        .submit_input(&id, "Backend engineer, 5 years, Rust", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    let before = h.workflow.current_plan(&id).await.unwrap();

    h.workflow
        .refine(&id, "Focus on people from startups")
        .await
        .unwrap();
    assert_eq!(h.workflow.pipeline_state(&id).await, PipelineState::Producing);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let after = h.workflow.current_plan(&id).await.unwrap();
    assert_eq!(
        after.target_companies,
        vec!["Stripe", "Figma", "Notion", "Linear", "Vercel"]
    );
    assert_eq!(after.revision, before.revision + 1);
    assert_eq!(after.filters.skills, before.filters.skills);

    let previews = h
        .workflow
        .conversation(&id)
        .await
        .iter()
        .filter(|t| t.kind() == TurnKind::StructuredPreview)
        .count();
    assert_eq!(previews, 2);
    // Refinement never renames the position.
    assert_eq!(h.workflow.job_spec(&id).await.unwrap().title, "Platform Engineer");
}

#[tokio::test(start_paused = true)]
async fn test_confirm_then_reject_shows_up_in_analytics() {
    let h = harness();
    let id = open(&h.workflow, "Frontend Engineer", "Acme").await;
    h.workflow
        .submit_input(&id, "Frontend engineer with React", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    let matches = h
        .workflow
        .confirm_plan(&id, Some("Looks right"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 6);
    assert_eq!(matches[0].display_name, "Maya Chen");
    assert_eq!(matches[0].overall_score, 91);
    assert!(matches
        .windows(2)
        .all(|w| w[0].overall_score >= w[1].overall_score));

    let spec = h.workflow.job_spec(&id).await.unwrap();
    assert_eq!(spec.status, JobSpecStatus::Completed);
    assert_eq!(spec.confirmation_notes.as_deref(), Some("Looks right"));
    assert_eq!(h.workflow.view_mode(&id).await, ViewMode::Overview);
    match &h.workflow.conversation(&id).await.last().unwrap().body {
        TurnBody::ResultSummary { text, .. } => {
            assert_eq!(text, "Found 6 candidates for Frontend Engineer")
        }
        other => panic!("unexpected turn {:?}", other),
    }

    let rejected = matches[2].id.clone();
    let record = h
        .workflow
        .submit_feedback(
            &id,
            &rejected,
            MatchStatus::Rejected,
            Some("bad culture fit".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(record.decision, MatchStatus::Rejected);

    let analytics = h.workflow.analytics(&id).await.unwrap();
    assert_eq!(analytics.total_feedback, 1);
    assert_eq!(analytics.rejection_reasons, vec!["bad culture fit"]);

    let metrics = h.workflow.metrics(&id).await.unwrap();
    assert_eq!(metrics.rejected, 1);
    assert_eq!(metrics.pending, 5);
    assert_eq!(metrics.total_feedback, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overall_score_is_computed_and_ranked() {
    let h = harness_with(Arc::new(FixedSource));
    let id = open(&h.workflow, "Designer", "Acme").await;
    h.workflow
        .submit_input(&id, "Product designer", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    let matches = h.workflow.confirm_plan(&id, None).await.unwrap();
    assert_eq!(matches[0].display_name, "Strong");
    assert_eq!(matches[1].display_name, "Average");
    assert_eq!(matches[1].overall_score, 75);
    assert!(h.workflow.has_started(&id).await);
}

#[tokio::test(start_paused = true)]
async fn test_delete_cascades_and_leaves_other_positions_alone() {
    let h = harness();
    let a = open(&h.workflow, "Data Scientist", "Acme").await;
    h.workflow
        .submit_input(&a, "Data scientist with Python", None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(h.workflow.reset_processing(&a).await);
    assert_eq!(h.workflow.conversation(&a).await.len(), 3);
    let spec_id = h.workflow.job_spec(&a).await.unwrap().id;

    let b = open(&h.workflow, "Account Executive", "Acme").await;
    h.workflow
        .submit_input(&b, "Sales lead in London", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    let b_turns = h.workflow.conversation(&b).await.len();
    assert_eq!(b_turns, 7);

    h.workflow.delete_position(&a).await.unwrap();

    assert!(h.workflow.conversation(&a).await.is_empty());
    assert!(!h.workflow.has_started(&a).await);
    assert!(h.store.chat_history(&a).is_empty());
    assert!(h.workflow.list_positions().await.iter().all(|p| p.id != a));
    let archived = h.workflow.job_specs().load(&spec_id).await.unwrap();
    assert_eq!(archived.status, JobSpecStatus::Archived);

    assert_eq!(h.workflow.conversation(&b).await.len(), b_turns);
    assert_eq!(h.store.chat_history(&b).len(), 1);
    assert_eq!(
        h.workflow.pipeline_state(&b).await,
        PipelineState::AwaitingConfirmation
    );
}

#[tokio::test(start_paused = true)]
async fn test_switching_positions_cancels_in_flight_run() {
    let h = harness();
    let a = open(&h.workflow, "Engineer", "Acme").await;
    h.workflow
        .submit_input(&a, "Senior engineer", None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(
        h.workflow.pipeline_state(&a).await,
        PipelineState::Announcing { step: 1, total: 4 }
    );

    let b = open(&h.workflow, "Designer", "Acme").await;
    assert_eq!(h.workflow.active_position().await, Some(b));
    tokio::time::sleep(Duration::from_secs(30)).await;

    let log = h.workflow.conversation(&a).await;
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|t| !t.pending));
    assert!(log.iter().all(|t| t.kind() != TurnKind::StructuredPreview));
    assert_eq!(h.workflow.pipeline_state(&a).await, PipelineState::Idle);
    assert!(h.workflow.current_plan(&a).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_immediate_switch_leaves_no_progress_behind() {
    let h = harness();
    let a = open(&h.workflow, "Engineer", "Acme").await;
    h.workflow
        .submit_input(&a, "Senior engineer", None)
        .await
        .unwrap();
    let b = open(&h.workflow, "Designer", "Acme").await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let log = h.workflow.conversation(&a).await;
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|t| !t.pending));
    assert!(h.workflow.conversation(&b).await.is_empty());
    assert!(!h.workflow.has_started(&b).await);
}

#[tokio::test(start_paused = true)]
async fn test_finished_preview_survives_a_switch() {
    let h = harness();
    let a = open(&h.workflow, "Engineer", "Acme").await;
    h.workflow
        .submit_input(&a, "Senior engineer", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    open(&h.workflow, "Designer", "Acme").await;
    let snapshot = h.workflow.select_position(&a).await.unwrap();
    assert_eq!(snapshot.view_mode, ViewMode::Overview);
    assert_eq!(snapshot.pipeline, PipelineState::AwaitingConfirmation);
    assert!(snapshot.plan.is_some());
    assert_eq!(snapshot.turns.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_title_blocks_confirmation() {
    let h = harness();
    let id = open(&h.workflow, "", "").await;
    h.workflow
        .submit_input(&id, "someone great", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    assert_eq!(
        h.workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );

    let err = h.workflow.confirm_plan(&id, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let spec = h.workflow.job_spec(&id).await.unwrap();
    assert_eq!(spec.status, JobSpecStatus::Draft);
    assert!(spec.has_placeholder_title());
    assert_eq!(
        h.workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );
    assert!(h
        .feed
        .recent()
        .iter()
        .any(|n| n.title == "Cannot confirm job specification"));
}

#[tokio::test(start_paused = true)]
async fn test_clear_conversation_allows_a_fresh_start() {
    let h = harness();
    let id = open(&h.workflow, "Engineer", "Acme").await;
    h.workflow
        .submit_input(&id, "Backend engineer", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    assert_eq!(h.workflow.clear_conversation(&id).await, 7);
    assert!(!h.workflow.has_started(&id).await);
    assert_eq!(h.workflow.pipeline_state(&id).await, PipelineState::Idle);
    assert!(h.store.chat_history(&id).is_empty());

    h.workflow
        .submit_input(&id, "Backend engineer with Go", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    assert_eq!(h.workflow.conversation(&id).await.len(), 7);
    assert!(h.workflow.current_plan(&id).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_oversized_plan_weights_are_clamped_before_refinement() {
    let h = harness();
    let id = open(&h.workflow, "Backend Engineer", "Acme").await;
    h.workflow
        .submit_input(&id, "Backend engineer with Rust", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    let edit: PlanEdit = serde_json::from_str(
        r#"{"weights":{"skills":250,"experience":30,"location":20},"location":"Berlin"}"#,
    )
    .unwrap();
    let plan = h.workflow.edit_plan(&id, &edit).await.unwrap();
    assert_eq!(plan.weights.skills, 100);

    h.workflow.refine(&id, "make it remote").await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(
        h.workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );
    let refined = h.workflow.current_plan(&id).await.unwrap();
    assert_eq!(refined.weights.skills, 100);
    assert_eq!(refined.weights.location, 10);
    assert_eq!(refined.revision, plan.revision + 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_match_save_can_be_retried_without_duplicates() {
    let h = harness();
    let id = open(&h.workflow, "Frontend Engineer", "Acme").await;
    h.workflow
        .submit_input(&id, "Frontend engineer with React", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;

    h.store.fail(Operation::InsertMatches);
    let err = h.workflow.confirm_plan(&id, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Persistence(_)));
    assert_eq!(
        h.workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );
    let spec = h.workflow.job_spec(&id).await.unwrap();
    assert!(h.store.list_matches(&spec.id).await.unwrap().is_empty());

    h.store.recover(Operation::InsertMatches);
    let matches = h.workflow.confirm_plan(&id, None).await.unwrap();
    assert_eq!(matches.len(), 6);
    assert_eq!(h.store.list_matches(&spec.id).await.unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_match_status_changes_stay_within_the_position() {
    let h = harness();
    let a = open(&h.workflow, "Frontend Engineer", "Acme").await;
    h.workflow
        .submit_input(&a, "Frontend engineer with React", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    let a_matches = h.workflow.confirm_plan(&a, None).await.unwrap();

    let b = open(&h.workflow, "Backend Engineer", "Acme").await;
    h.workflow
        .submit_input(&b, "Backend engineer with Go", None)
        .await
        .unwrap();
    tokio::time::sleep(PIPELINE_DONE).await;
    let b_matches = h.workflow.confirm_plan(&b, None).await.unwrap();

    let foreign = b_matches[0].id.clone();
    let err = h
        .workflow
        .update_match_status(&a, &foreign, MatchStatus::Interviewed)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(_)));
    let b_now = h.workflow.matches(&b).await.unwrap();
    assert!(b_now.iter().all(|m| m.status == MatchStatus::Pending));

    let own = a_matches[0].id.clone();
    h.workflow
        .update_match_status(&a, &own, MatchStatus::Interviewed)
        .await
        .unwrap();
    let err = h
        .workflow
        .update_match_status(&a, &own, MatchStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
    let a_now = h.workflow.matches(&a).await.unwrap();
    let own_now = a_now.iter().find(|m| m.id == own).unwrap();
    assert_eq!(own_now.status, MatchStatus::Interviewed);
}

#[tokio::test(start_paused = true)]
async fn test_job_spec_edits_apply_between_runs() {
    let h = harness();
    let id = open(&h.workflow, "Engineer", "Acme").await;
    let patch = JobSpecPatch {
        title: Some("Staff Engineer".to_string()),
        primary_skills: Some(vec!["Go".to_string()]),
        ..JobSpecPatch::default()
    };
    assert!(h.workflow.edit_job_spec(&id, &patch).await.is_err());

    h.workflow
        .submit_input(&id, "Backend engineer", None)
        .await
        .unwrap();
    let err = h.workflow.edit_job_spec(&id, &patch).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    tokio::time::sleep(PIPELINE_DONE).await;
    let edited = h.workflow.edit_job_spec(&id, &patch).await.unwrap();
    assert_eq!(edited.title, "Staff Engineer");
    assert_eq!(edited.primary_skills, vec!["Go"]);
    assert_eq!(edited.status, JobSpecStatus::Draft);
    assert_eq!(h.workflow.job_spec(&id).await, Some(edited.clone()));
    assert_eq!(
        h.store.find_job_spec(&edited.id).await.unwrap(),
        Some(edited)
    );
}

/// Memory store whose job specification saves take five seconds once armed.
struct SlowSaves {
    inner: MemoryStore,
    slow: AtomicBool,
}

#[async_trait]
impl RecruitingStore for SlowSaves {
    async fn list_positions(&self) -> StoreResult<Vec<Position>> {
        self.inner.list_positions().await
    }
    async fn insert_position(&self, position: &Position) -> StoreResult<()> {
        self.inner.insert_position(position).await
    }
    async fn update_position(&self, position: &Position) -> StoreResult<bool> {
        self.inner.update_position(position).await
    }
    async fn delete_position(&self, id: &PositionId) -> StoreResult<bool> {
        self.inner.delete_position(id).await
    }
    async fn find_job_spec(&self, id: &JobSpecId) -> StoreResult<Option<JobSpecification>> {
        self.inner.find_job_spec(id).await
    }
    async fn find_job_spec_for_position(
        &self,
        position_id: &PositionId,
    ) -> StoreResult<Option<JobSpecification>> {
        self.inner.find_job_spec_for_position(position_id).await
    }
    async fn save_job_spec(&self, spec: &JobSpecification) -> StoreResult<()> {
        if self.slow.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.inner.save_job_spec(spec).await
    }
    async fn list_matches(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<CandidateMatch>> {
        self.inner.list_matches(job_spec_id).await
    }
    async fn insert_matches(&self, candidates: &[CandidateMatch]) -> StoreResult<()> {
        self.inner.insert_matches(candidates).await
    }
    async fn update_match_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool> {
        self.inner.update_match_status(id, status).await
    }
    async fn insert_feedback(&self, record: &FeedbackRecord) -> StoreResult<()> {
        self.inner.insert_feedback(record).await
    }
    async fn list_feedback(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<FeedbackRecord>> {
        self.inner.list_feedback(job_spec_id).await
    }
    async fn append_chat_history(&self, entry: &ChatHistoryEntry) -> StoreResult<()> {
        self.inner.append_chat_history(entry).await
    }
    async fn delete_chat_history(&self, position_id: &PositionId) -> StoreResult<u64> {
        self.inner.delete_chat_history(position_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_preview_save_does_not_block_reads() {
    let store = Arc::new(SlowSaves {
        inner: MemoryStore::new(),
        slow: AtomicBool::new(false),
    });
    let blobs = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default();
    let workflow = Workflow::new(
        Collaborators {
            store: store.clone(),
            blobs,
            notifier: Arc::new(NotificationFeed::new(10)),
            extractor: Arc::new(ScriptedExtractor::new(&config)),
            source: Arc::new(SampleCandidateSource),
        },
        config.confirmation_message,
    );
    let id = open(&workflow, "Engineer", "Acme").await;
    workflow
        .submit_input(&id, "Backend engineer", None)
        .await
        .unwrap();
    store.slow.store(true, Ordering::SeqCst);

    // The final save starts at 6s and holds until 11s.
    tokio::time::sleep(Duration::from_millis(6500)).await;
    let started = tokio::time::Instant::now();
    assert_eq!(workflow.conversation(&id).await.len(), 6);
    assert_eq!(workflow.pipeline_state(&id).await, PipelineState::Producing);
    assert!(started.elapsed() < Duration::from_millis(100));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        workflow.pipeline_state(&id).await,
        PipelineState::AwaitingConfirmation
    );
    assert_eq!(workflow.conversation(&id).await.len(), 7);
}
