// src/workflow/candidates.rs
//! Scored candidate matches for a job specification

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::surface;
use crate::core::{Notifier, RecruitingStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    rank_matches, CandidateDraft, CandidateMatch, JobSpecId, MatchId, MatchStatus,
};

/// Transient narrowing of the visible match list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    pub min_score: Option<u8>,
    pub status: Option<MatchStatus>,
}

impl MatchFilter {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none() && self.status.is_none()
    }

    pub fn accepts(&self, candidate: &CandidateMatch) -> bool {
        self.min_score.map_or(true, |min| candidate.overall_score >= min)
            && self.status.map_or(true, |status| candidate.status == status)
    }

    pub fn apply(&self, matches: &[CandidateMatch]) -> Vec<CandidateMatch> {
        matches.iter().filter(|m| self.accepts(m)).cloned().collect()
    }
}

pub struct CandidateCollection {
    store: Arc<dyn RecruitingStore>,
    notifier: Arc<dyn Notifier>,
}

impl CandidateCollection {
    pub fn new(store: Arc<dyn RecruitingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Highest overall score first; ties keep their stored order.
    pub async fn load_for_job_spec(
        &self,
        job_spec_id: &JobSpecId,
    ) -> WorkflowResult<Vec<CandidateMatch>> {
        let mut matches = surface(
            self.notifier.as_ref(),
            "Failed to load candidate matches",
            self.store.list_matches(job_spec_id).await,
        )?;
        rank_matches(&mut matches);
        Ok(matches)
    }

    pub async fn update_status(&self, match_id: &MatchId, status: MatchStatus) -> WorkflowResult<()> {
        let updated = surface(
            self.notifier.as_ref(),
            "Failed to update candidate",
            self.store.update_match_status(match_id, status).await,
        )?;
        if !updated {
            return Err(WorkflowError::not_found(format!("candidate match {}", match_id)));
        }
        info!("Candidate match {} is now {}", match_id, status.as_str());
        Ok(())
    }

    /// Store results reported by the search collaborator. The overall score
    /// is computed here from the sub-scores.
    pub async fn ingest(
        &self,
        job_spec_id: &JobSpecId,
        drafts: Vec<CandidateDraft>,
    ) -> WorkflowResult<Vec<CandidateMatch>> {
        let mut matches: Vec<_> = drafts
            .into_iter()
            .map(|draft| CandidateMatch::from_draft(job_spec_id.clone(), draft))
            .collect();
        rank_matches(&mut matches);
        surface(
            self.notifier.as_ref(),
            "Failed to save candidate matches",
            self.store.insert_matches(&matches).await,
        )?;
        info!("Stored {} candidate matches for {}", matches.len(), job_spec_id);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryStore, NotificationFeed, Operation};
    use crate::types::{DiscoveryChannel, SubScores};

    fn draft(name: &str, scores: SubScores) -> CandidateDraft {
        CandidateDraft {
            candidate_ref: name.to_lowercase(),
            display_name: name.to_string(),
            current_title: None,
            current_company: None,
            channel: DiscoveryChannel::ProfessionalNetwork,
            scores,
            score_breakdown: None,
        }
    }

    fn collection() -> CandidateCollection {
        CandidateCollection::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NotificationFeed::new(10)),
        )
    }

    #[tokio::test]
    async fn test_ingest_scores_and_ranks() {
        let candidates = collection();
        let spec = JobSpecId::from("spec-1");
        let stored = candidates
            .ingest(
                &spec,
                vec![
                    draft("Ada", SubScores::new(80, 60, 90, 70)),
                    draft("Grace", SubScores::new(95, 90, 90, 85)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(stored[0].display_name, "Grace");
        assert_eq!(stored[1].overall_score, 75);

        let loaded = candidates.load_for_job_spec(&spec).await.unwrap();
        let scores: Vec<_> = loaded.iter().map(|m| m.overall_score).collect();
        assert_eq!(scores, vec![90, 75]);
    }

    #[tokio::test]
    async fn test_failed_ingest_leaves_nothing_behind() {
        let store = Arc::new(MemoryStore::new());
        let candidates = CandidateCollection::new(store.clone(), Arc::new(NotificationFeed::new(10)));
        let spec = JobSpecId::from("spec-1");
        let drafts = vec![
            draft("Ada", SubScores::new(80, 60, 90, 70)),
            draft("Grace", SubScores::new(95, 90, 90, 85)),
        ];

        store.fail(Operation::InsertMatches);
        let err = candidates.ingest(&spec, drafts.clone()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Persistence(_)));
        assert!(candidates.load_for_job_spec(&spec).await.unwrap().is_empty());

        store.recover(Operation::InsertMatches);
        candidates.ingest(&spec, drafts).await.unwrap();
        assert_eq!(candidates.load_for_job_spec(&spec).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_status_unknown_match() {
        let candidates = collection();
        let err = candidates
            .update_status(&MatchId::from("missing"), MatchStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_filter_by_score_and_status() {
        let spec = JobSpecId::from("spec-1");
        let mut low = CandidateMatch::from_draft(spec.clone(), draft("Ada", SubScores::new(50, 50, 50, 50)));
        low.status = MatchStatus::Approved;
        let high = CandidateMatch::from_draft(spec, draft("Grace", SubScores::new(90, 90, 90, 90)));
        let all = vec![high, low];

        let filter = MatchFilter {
            min_score: Some(60),
            status: None,
        };
        assert_eq!(filter.apply(&all).len(), 1);
        let filter = MatchFilter {
            min_score: None,
            status: Some(MatchStatus::Approved),
        };
        assert_eq!(filter.apply(&all)[0].display_name, "Ada");
        assert!(MatchFilter::default().is_empty());
        assert_eq!(MatchFilter::default().apply(&all).len(), 2);
    }
}
