// src/core/memory_store.rs
//! In-process store used by tests and the offline demo

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::ports::{BlobStore, RecruitingStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{
    rank_matches, CandidateMatch, ChatHistoryEntry, FeedbackRecord, JobSpecId,
    JobSpecification, MatchId, MatchStatus, Position, PositionId,
};

/// Store operations that can be switched into failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPositions,
    InsertPosition,
    UpdatePosition,
    DeletePosition,
    LoadJobSpec,
    SaveJobSpec,
    ListMatches,
    InsertMatches,
    UpdateMatchStatus,
    InsertFeedback,
    ListFeedback,
    AppendChatHistory,
    Upload,
}

#[derive(Default)]
struct Tables {
    positions: Vec<Position>,
    job_specs: Vec<JobSpecification>,
    matches: Vec<CandidateMatch>,
    feedback: Vec<FeedbackRecord>,
    chat_history: Vec<ChatHistoryEntry>,
    blobs: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<Operation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `operation` fail until `recover` is called.
    pub fn fail(&self, operation: Operation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&operation);
    }

    pub fn chat_history(&self, position_id: &PositionId) -> Vec<ChatHistoryEntry> {
        self.tables()
            .chat_history
            .iter()
            .filter(|e| &e.position_id == position_id)
            .cloned()
            .collect()
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.tables().blobs.get(path).cloned()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: Operation) -> StoreResult<()> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&operation) {
            Err(StoreError::Unavailable(format!("{:?} is failing", operation)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecruitingStore for MemoryStore {
    async fn list_positions(&self) -> StoreResult<Vec<Position>> {
        self.check(Operation::ListPositions)?;
        let mut positions = self.tables().positions.clone();
        positions.reverse();
        Ok(positions)
    }

    async fn insert_position(&self, position: &Position) -> StoreResult<()> {
        self.check(Operation::InsertPosition)?;
        self.tables().positions.push(position.clone());
        Ok(())
    }

    async fn update_position(&self, position: &Position) -> StoreResult<bool> {
        self.check(Operation::UpdatePosition)?;
        let mut tables = self.tables();
        match tables.positions.iter_mut().find(|p| p.id == position.id) {
            Some(existing) => {
                *existing = position.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_position(&self, id: &PositionId) -> StoreResult<bool> {
        self.check(Operation::DeletePosition)?;
        let mut tables = self.tables();
        let before = tables.positions.len();
        tables.positions.retain(|p| &p.id != id);
        Ok(tables.positions.len() != before)
    }

    async fn find_job_spec(&self, id: &JobSpecId) -> StoreResult<Option<JobSpecification>> {
        self.check(Operation::LoadJobSpec)?;
        Ok(self.tables().job_specs.iter().find(|s| &s.id == id).cloned())
    }

    async fn find_job_spec_for_position(
        &self,
        position_id: &PositionId,
    ) -> StoreResult<Option<JobSpecification>> {
        self.check(Operation::LoadJobSpec)?;
        Ok(self
            .tables()
            .job_specs
            .iter()
            .rev()
            .find(|s| &s.position_id == position_id)
            .cloned())
    }

    async fn save_job_spec(&self, spec: &JobSpecification) -> StoreResult<()> {
        self.check(Operation::SaveJobSpec)?;
        let mut tables = self.tables();
        match tables.job_specs.iter_mut().find(|s| s.id == spec.id) {
            Some(existing) => *existing = spec.clone(),
            None => tables.job_specs.push(spec.clone()),
        }
        Ok(())
    }

    async fn list_matches(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<CandidateMatch>> {
        self.check(Operation::ListMatches)?;
        let mut matches: Vec<_> = self
            .tables()
            .matches
            .iter()
            .filter(|m| &m.job_spec_id == job_spec_id)
            .cloned()
            .collect();
        rank_matches(&mut matches);
        Ok(matches)
    }

    async fn insert_matches(&self, candidates: &[CandidateMatch]) -> StoreResult<()> {
        self.check(Operation::InsertMatches)?;
        self.tables().matches.extend_from_slice(candidates);
        Ok(())
    }

    async fn update_match_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool> {
        self.check(Operation::UpdateMatchStatus)?;
        let mut tables = self.tables();
        match tables.matches.iter_mut().find(|m| &m.id == id) {
            Some(existing) => {
                existing.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> StoreResult<()> {
        self.check(Operation::InsertFeedback)?;
        self.tables().feedback.push(record.clone());
        Ok(())
    }

    async fn list_feedback(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<FeedbackRecord>> {
        self.check(Operation::ListFeedback)?;
        Ok(self
            .tables()
            .feedback
            .iter()
            .filter(|r| &r.job_spec_id == job_spec_id)
            .cloned()
            .collect())
    }

    async fn append_chat_history(&self, entry: &ChatHistoryEntry) -> StoreResult<()> {
        self.check(Operation::AppendChatHistory)?;
        self.tables().chat_history.push(entry.clone());
        Ok(())
    }

    async fn delete_chat_history(&self, position_id: &PositionId) -> StoreResult<u64> {
        let mut tables = self.tables();
        let before = tables.chat_history.len();
        tables.chat_history.retain(|e| &e.position_id != position_id);
        Ok((before - tables.chat_history.len()) as u64)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn upload(&self, bucket: &str, filename: &str, bytes: &[u8]) -> StoreResult<String> {
        self.check(Operation::Upload)?;
        let path = format!("{}/{}", bucket, crate::core::fs_ops::sanitize_file_name(filename));
        self.tables().blobs.insert(path.clone(), bytes.to_vec());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_switch() {
        let store = MemoryStore::new();
        let position = Position::new("Designer", "Acme");

        store.fail(Operation::InsertPosition);
        assert!(store.insert_position(&position).await.is_err());
        assert!(store.list_positions().await.unwrap().is_empty());

        store.recover(Operation::InsertPosition);
        store.insert_position(&position).await.unwrap();
        assert_eq!(store.list_positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_keeps_bytes() {
        let store = MemoryStore::new();
        let path = store.upload("audio", "memo.webm", b"abc").await.unwrap();
        assert_eq!(path, "audio/memo.webm");
        assert_eq!(store.blob(&path), Some(b"abc".to_vec()));
    }
}
