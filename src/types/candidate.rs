// src/types/candidate.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{clamp_percentage, JobSpecId, MatchId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Approved,
    Rejected,
    Interviewed,
    Hired,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Interviewed => "interviewed",
            Self::Hired => "hired",
        }
    }

    /// Decisions a reviewer can record through feedback.
    pub fn is_review_decision(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "interviewed" => Ok(Self::Interviewed),
            "hired" => Ok(Self::Hired),
            other => Err(format!("unknown match status: {}", other)),
        }
    }
}

/// Data-source layer a candidate was discovered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryChannel {
    ProfessionalNetwork,
    CodeRepository,
    JobBoard,
    Referral,
    TalentPool,
}

impl DiscoveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfessionalNetwork => "professional_network",
            Self::CodeRepository => "code_repository",
            Self::JobBoard => "job_board",
            Self::Referral => "referral",
            Self::TalentPool => "talent_pool",
        }
    }
}

impl FromStr for DiscoveryChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professional_network" => Ok(Self::ProfessionalNetwork),
            "code_repository" => Ok(Self::CodeRepository),
            "job_board" => Ok(Self::JobBoard),
            "referral" => Ok(Self::Referral),
            "talent_pool" => Ok(Self::TalentPool),
            other => Err(format!("unknown discovery channel: {}", other)),
        }
    }
}

/// Per-dimension match percentages. Deserialized values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubScoresInput")]
pub struct SubScores {
    pub skills: u8,
    pub experience: u8,
    pub location: u8,
    pub company: u8,
}

impl SubScores {
    pub fn new(skills: i64, experience: i64, location: i64, company: i64) -> Self {
        Self {
            skills: clamp_percentage(skills),
            experience: clamp_percentage(experience),
            location: clamp_percentage(location),
            company: clamp_percentage(company),
        }
    }

    /// Unweighted mean of the four sub-scores, rounded to the nearest integer.
    pub fn overall(&self) -> u8 {
        let sum = u32::from(self.skills)
            + u32::from(self.experience)
            + u32::from(self.location)
            + u32::from(self.company);
        clamp_percentage((f64::from(sum) / 4.0).round() as i64)
    }
}

#[derive(Deserialize)]
struct SubScoresInput {
    skills: i64,
    experience: i64,
    location: i64,
    company: i64,
}

impl From<SubScoresInput> for SubScores {
    fn from(input: SubScoresInput) -> Self {
        Self::new(input.skills, input.experience, input.location, input.company)
    }
}

/// A candidate as reported by the search collaborator, before the core
/// assigns identity and the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub candidate_ref: String,
    pub display_name: String,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub channel: DiscoveryChannel,
    pub scores: SubScores,
    pub score_breakdown: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub id: MatchId,
    pub job_spec_id: JobSpecId,
    pub candidate_ref: String,
    pub display_name: String,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub channel: DiscoveryChannel,
    pub scores: SubScores,
    pub overall_score: u8,
    pub status: MatchStatus,
    pub score_breakdown: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl CandidateMatch {
    /// Sub-scores are re-clamped here since drafts come from outside the core.
    pub fn from_draft(job_spec_id: JobSpecId, draft: CandidateDraft) -> Self {
        let raw = draft.scores;
        let scores = SubScores::new(
            i64::from(raw.skills),
            i64::from(raw.experience),
            i64::from(raw.location),
            i64::from(raw.company),
        );
        Self {
            id: MatchId::generate(),
            job_spec_id,
            overall_score: scores.overall(),
            candidate_ref: draft.candidate_ref,
            display_name: draft.display_name,
            current_title: draft.current_title,
            current_company: draft.current_company,
            channel: draft.channel,
            scores,
            status: MatchStatus::Pending,
            score_breakdown: draft.score_breakdown,
            created_at: Utc::now(),
        }
    }
}

/// Sort matches by overall score, highest first; equal scores keep input order.
pub fn rank_matches(matches: &mut [CandidateMatch]) {
    matches.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));
}

/// Display aggregate for one position's candidate pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionMetrics {
    pub total_matches: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub interviewed: usize,
    pub hired: usize,
    pub average_score: Option<u8>,
    pub total_feedback: usize,
}

impl PositionMetrics {
    pub fn compute(matches: &[CandidateMatch], total_feedback: usize) -> Self {
        let mut metrics = Self {
            total_matches: matches.len(),
            total_feedback,
            ..Self::default()
        };
        for m in matches {
            match m.status {
                MatchStatus::Pending => metrics.pending += 1,
                MatchStatus::Approved => metrics.approved += 1,
                MatchStatus::Rejected => metrics.rejected += 1,
                MatchStatus::Interviewed => metrics.interviewed += 1,
                MatchStatus::Hired => metrics.hired += 1,
            }
        }
        if !matches.is_empty() {
            let sum: u32 = matches.iter().map(|m| u32::from(m.overall_score)).sum();
            let mean = (f64::from(sum) / matches.len() as f64).round() as i64;
            metrics.average_score = Some(clamp_percentage(mean));
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, scores: SubScores) -> CandidateMatch {
        CandidateMatch::from_draft(
            JobSpecId::from("spec-1"),
            CandidateDraft {
                candidate_ref: name.to_lowercase(),
                display_name: name.to_string(),
                current_title: None,
                current_company: None,
                channel: DiscoveryChannel::JobBoard,
                scores,
                score_breakdown: None,
            },
        )
    }

    #[test]
    fn test_overall_is_rounded_mean() {
        assert_eq!(SubScores::new(80, 60, 90, 70).overall(), 75);
        assert_eq!(SubScores::new(81, 60, 90, 70).overall(), 75);
        assert_eq!(SubScores::new(82, 60, 90, 70).overall(), 76);
    }

    #[test]
    fn test_sub_scores_are_clamped() {
        let scores = SubScores::new(140, -3, 50, 100);
        assert_eq!(scores.skills, 100);
        assert_eq!(scores.experience, 0);
        assert_eq!(scores.overall(), 63);
    }

    #[test]
    fn test_out_of_range_draft_scores_are_clamped() {
        let reported = SubScores {
            skills: 250,
            experience: 60,
            location: 90,
            company: 70,
        };
        let stored = candidate("Ada", reported);
        assert_eq!(stored.scores.skills, 100);
        assert_eq!(stored.overall_score, 80);

        let parsed: SubScores = serde_json::from_str(
            r#"{"skills":250,"experience":-10,"location":90,"company":70}"#,
        )
        .unwrap();
        assert_eq!((parsed.skills, parsed.experience), (100, 0));
    }

    #[test]
    fn test_ranking_is_descending_and_stable() {
        let mut matches = vec![
            candidate("Ada", SubScores::new(70, 70, 70, 70)),
            candidate("Grace", SubScores::new(90, 90, 90, 90)),
            candidate("Linus", SubScores::new(70, 70, 70, 70)),
        ];
        rank_matches(&mut matches);
        let names: Vec<_> = matches.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(names, vec!["Grace", "Ada", "Linus"]);
    }

    #[test]
    fn test_metrics_count_statuses() {
        let mut matches = vec![
            candidate("Ada", SubScores::new(80, 60, 90, 70)),
            candidate("Grace", SubScores::new(90, 90, 90, 90)),
        ];
        matches[1].status = MatchStatus::Rejected;
        let metrics = PositionMetrics::compute(&matches, 1);
        assert_eq!(metrics.total_matches, 2);
        assert_eq!(metrics.pending, 1);
        assert_eq!(metrics.rejected, 1);
        assert_eq!(metrics.average_score, Some(83));
        assert_eq!(PositionMetrics::compute(&[], 0).average_score, None);
    }
}
