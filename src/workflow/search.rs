// src/workflow/search.rs
//! The external candidate search collaborator

use async_trait::async_trait;
use serde_json::json;

use crate::error::WorkflowResult;
use crate::types::{CandidateDraft, DiscoveryChannel, JobSpecification, SearchPlan, SubScores};

/// Runs a confirmed search plan and reports candidates with sub-scores only.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search(
        &self,
        spec: &JobSpecification,
        plan: &SearchPlan,
    ) -> WorkflowResult<Vec<CandidateDraft>>;
}

const ROSTER: [(&str, [i64; 4], DiscoveryChannel); 6] = [
    ("Maya Chen", [94, 88, 92, 90], DiscoveryChannel::ProfessionalNetwork),
    ("Jordan Alvarez", [86, 91, 75, 84], DiscoveryChannel::CodeRepository),
    ("Priya Natarajan", [90, 72, 88, 70], DiscoveryChannel::ProfessionalNetwork),
    ("Samuel Okafor", [78, 85, 95, 66], DiscoveryChannel::Referral),
    ("Elena Petrova", [72, 64, 80, 78], DiscoveryChannel::JobBoard),
    ("Tom Becker", [60, 70, 55, 62], DiscoveryChannel::TalentPool),
];

/// Fixed roster dressed up with the plan's companies, titles and skills.
#[derive(Debug, Default)]
pub struct SampleCandidateSource;

#[async_trait]
impl CandidateSource for SampleCandidateSource {
    async fn search(
        &self,
        spec: &JobSpecification,
        plan: &SearchPlan,
    ) -> WorkflowResult<Vec<CandidateDraft>> {
        let pick = |list: &[String], i: usize| {
            if list.is_empty() {
                None
            } else {
                Some(list[i % list.len()].clone())
            }
        };

        Ok(ROSTER
            .iter()
            .enumerate()
            .map(|(i, (name, [skills, experience, location, company], channel))| {
                let matched: Vec<_> = plan
                    .filters
                    .skills
                    .iter()
                    .take(plan.filters.skills.len().saturating_sub(i / 2).max(1))
                    .cloned()
                    .collect();
                CandidateDraft {
                    candidate_ref: format!("{}-{}", spec.id, i + 1),
                    display_name: name.to_string(),
                    current_title: pick(&plan.relevant_titles, i),
                    current_company: pick(&plan.target_companies, i),
                    channel: *channel,
                    scores: SubScores::new(*skills, *experience, *location, *company),
                    score_breakdown: Some(json!({
                        "matched_skills": matched,
                        "experience_range": plan.filters.experience,
                        "location": plan.filters.location,
                    })),
                }
            })
            .collect())
    }
}
