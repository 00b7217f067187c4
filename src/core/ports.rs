// src/core/ports.rs
//! Collaborator interfaces the workflow core is constructed with

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    CandidateMatch, ChatHistoryEntry, FeedbackRecord, JobSpecId, JobSpecification, MatchId,
    MatchStatus, Position, PositionId,
};

/// Relational-style persistence for every record the core owns.
#[async_trait]
pub trait RecruitingStore: Send + Sync {
    // ===== Positions =====
    async fn list_positions(&self) -> StoreResult<Vec<Position>>;
    async fn insert_position(&self, position: &Position) -> StoreResult<()>;
    async fn update_position(&self, position: &Position) -> StoreResult<bool>;
    async fn delete_position(&self, id: &PositionId) -> StoreResult<bool>;

    // ===== Job specifications =====
    async fn find_job_spec(&self, id: &JobSpecId) -> StoreResult<Option<JobSpecification>>;
    async fn find_job_spec_for_position(
        &self,
        position_id: &PositionId,
    ) -> StoreResult<Option<JobSpecification>>;
    async fn save_job_spec(&self, spec: &JobSpecification) -> StoreResult<()>;

    // ===== Candidate matches =====
    async fn list_matches(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<CandidateMatch>>;
    /// Insert a whole result set. Either every match is stored or none is.
    async fn insert_matches(&self, candidates: &[CandidateMatch]) -> StoreResult<()>;
    async fn update_match_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool>;

    // ===== Recruiter feedback =====
    async fn insert_feedback(&self, record: &FeedbackRecord) -> StoreResult<()>;
    async fn list_feedback(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<FeedbackRecord>>;

    // ===== Chat history =====
    async fn append_chat_history(&self, entry: &ChatHistoryEntry) -> StoreResult<()>;
    async fn delete_chat_history(&self, position_id: &PositionId) -> StoreResult<u64>;
}

/// Object storage for uploaded audio and documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `bucket/filename` and return the stored path.
    async fn upload(&self, bucket: &str, filename: &str, bytes: &[u8]) -> StoreResult<String>;
}
