// src/types/search_plan.rs
use serde::{Deserialize, Serialize};

use super::clamp_percentage;
use super::job_spec::{ExperienceRange, SalaryRange};

/// Derived targeting parameters for a candidate search. Replaced wholesale on
/// refinement; only `PlanEdit` changes individual sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub job_summary: String,
    pub target_companies: Vec<String>,
    pub relevant_titles: Vec<String>,
    pub filters: SearchFilters,
    pub weights: SearchWeights,
    /// Bumped every time a refinement produces a replacement plan.
    pub revision: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub experience: ExperienceRange,
    pub location: String,
    pub salary: SalaryRange,
    pub skills: Vec<String>,
}

/// Relative importance of each scoring dimension, in percent. Incoming
/// values are clamped to 0..=100 on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WeightsInput")]
pub struct SearchWeights {
    pub skills: u8,
    pub experience: u8,
    pub location: u8,
}

impl SearchWeights {
    pub fn new(skills: u8, experience: u8, location: u8) -> Self {
        Self {
            skills: skills.min(100),
            experience: experience.min(100),
            location: location.min(100),
        }
    }

    /// Shift `points` from location to skills.
    pub fn favour_skills(&self, points: u8) -> Self {
        Self::new(
            self.skills.saturating_add(points),
            self.experience,
            self.location.saturating_sub(points),
        )
    }

    pub fn total(&self) -> u16 {
        u16::from(self.skills) + u16::from(self.experience) + u16::from(self.location)
    }

    /// Weights are a soft budget: anything other than 100 is allowed but flagged.
    pub fn is_balanced(&self) -> bool {
        self.total() == 100
    }
}

#[derive(Deserialize)]
struct WeightsInput {
    skills: i64,
    experience: i64,
    location: i64,
}

impl From<WeightsInput> for SearchWeights {
    fn from(input: WeightsInput) -> Self {
        Self {
            skills: clamp_percentage(input.skills),
            experience: clamp_percentage(input.experience),
            location: clamp_percentage(input.location),
        }
    }
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self::new(50, 30, 20)
    }
}

/// Explicit reviewer edits to a plan. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEdit {
    pub job_summary: Option<String>,
    pub target_companies: Option<Vec<String>>,
    pub relevant_titles: Option<Vec<String>>,
    pub experience: Option<ExperienceRange>,
    pub location: Option<String>,
    pub salary: Option<SalaryRange>,
    pub skills: Option<Vec<String>>,
    pub weights: Option<SearchWeights>,
}

impl SearchPlan {
    pub fn edited(&self, edit: &PlanEdit) -> Self {
        let mut next = self.clone();
        if let Some(summary) = &edit.job_summary {
            next.job_summary = summary.clone();
        }
        if let Some(companies) = &edit.target_companies {
            next.target_companies = companies.clone();
        }
        if let Some(titles) = &edit.relevant_titles {
            next.relevant_titles = titles.clone();
        }
        if let Some(experience) = edit.experience {
            next.filters.experience = experience;
        }
        if let Some(location) = &edit.location {
            next.filters.location = location.clone();
        }
        if let Some(salary) = edit.salary {
            next.filters.salary = salary;
        }
        if let Some(skills) = &edit.skills {
            next.filters.skills = skills.clone();
        }
        if let Some(weights) = edit.weights {
            next.weights = SearchWeights::new(weights.skills, weights.experience, weights.location);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SearchPlan {
        SearchPlan {
            job_summary: "Backend engineer".to_string(),
            target_companies: vec!["Google".to_string()],
            relevant_titles: vec!["Software Engineer".to_string()],
            filters: SearchFilters {
                experience: ExperienceRange::new(3, 7),
                location: "Remote".to_string(),
                salary: SalaryRange::usd(120_000, 160_000),
                skills: vec!["Rust".to_string()],
            },
            weights: SearchWeights::default(),
            revision: 1,
        }
    }

    #[test]
    fn test_default_weights_are_balanced() {
        assert!(SearchWeights::default().is_balanced());
        assert!(!SearchWeights::new(60, 30, 20).is_balanced());
        assert_eq!(SearchWeights::new(200, 0, 0).total(), 100);
    }

    #[test]
    fn test_incoming_weights_are_clamped() {
        let edit: PlanEdit = serde_json::from_str(
            r#"{"weights":{"skills":250,"experience":-4,"location":20},"location":"Berlin"}"#,
        )
        .unwrap();
        let weights = edit.weights.unwrap();
        assert_eq!((weights.skills, weights.experience, weights.location), (100, 0, 20));

        let edited = plan().edited(&PlanEdit {
            weights: Some(SearchWeights {
                skills: 180,
                experience: 30,
                location: 20,
            }),
            ..PlanEdit::default()
        });
        assert_eq!(edited.weights.skills, 100);
        assert_eq!(edited.weights.favour_skills(10).skills, 100);
        assert_eq!(SearchWeights::new(95, 0, 5).favour_skills(10).location, 0);
    }

    #[test]
    fn test_edit_replaces_only_given_sections() {
        let original = plan();
        let edited = original.edited(&PlanEdit {
            target_companies: Some(vec!["Stripe".to_string(), "Linear".to_string()]),
            ..PlanEdit::default()
        });
        assert_eq!(edited.target_companies, vec!["Stripe", "Linear"]);
        assert_eq!(edited.filters, original.filters);
        assert_eq!(edited.revision, original.revision);
    }
}
