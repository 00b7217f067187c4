// src/types/mod.rs
//! Domain records shared by the workflow core, the stores and the HTTP layer

pub mod candidate;
pub mod conversation;
pub mod feedback;
pub mod job_spec;
pub mod position;
pub mod search_plan;

pub use candidate::{
    rank_matches, CandidateDraft, CandidateMatch, DiscoveryChannel, MatchStatus, PositionMetrics,
    SubScores,
};
pub use conversation::{Attachment, ChatHistoryEntry, ConversationTurn, TurnBody, TurnKind};
pub use feedback::{FeedbackAnalytics, FeedbackRecord};
pub use job_spec::{
    ExperienceRange, JobSpecPatch, JobSpecStatus, JobSpecification, SalaryRange, WorkMode,
};
pub use position::{Position, PositionPatch, PositionStatus};
pub use search_plan::{PlanEdit, SearchFilters, SearchPlan, SearchWeights};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an opaque, URL-safe string identifier.
macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PositionId);
string_id!(TurnId);
string_id!(JobSpecId);
string_id!(MatchId);
string_id!(FeedbackId);

/// Clamp an arbitrary integer into the 0..=100 percentage range.
pub fn clamp_percentage(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
