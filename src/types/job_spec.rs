// src/types/job_spec.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::position::{PLACEHOLDER_ORGANIZATION, PLACEHOLDER_TITLE};
use super::{JobSpecId, PositionId};

/// Lifecycle of a job specification. Ordering follows declaration order and
/// transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSpecStatus {
    Draft,
    Confirmed,
    Searching,
    Completed,
    Archived,
}

impl JobSpecStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Searching => "searching",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// A draft must be confirmed before it can be searched or completed.
    /// Archiving is allowed from anywhere except Archived itself.
    pub fn can_advance_to(&self, next: JobSpecStatus) -> bool {
        match self {
            Self::Draft => matches!(next, Self::Confirmed | Self::Archived),
            _ => next > *self,
        }
    }
}

impl FromStr for JobSpecStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "confirmed" => Ok(Self::Confirmed),
            "searching" => Ok(Self::Searching),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown job specification status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min_years: u8,
    pub max_years: u8,
}

impl ExperienceRange {
    pub fn new(min_years: u8, max_years: u8) -> Self {
        Self {
            min_years: min_years.min(max_years),
            max_years: max_years.max(min_years),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
}

impl SalaryRange {
    pub fn usd(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
            currency: Currency::Usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpecification {
    pub id: JobSpecId,
    pub position_id: PositionId,
    pub status: JobSpecStatus,
    pub title: String,
    pub organization: String,
    pub description: Option<String>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub primary_skills: Vec<String>,
    pub secondary_skills: Vec<String>,
    pub experience: Option<ExperienceRange>,
    pub location: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub salary: Option<SalaryRange>,
    pub raw_input: Option<String>,
    pub audio_ref: Option<String>,
    pub document_ref: Option<String>,
    pub confirmation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobSpecification {
    pub fn draft(position_id: PositionId, title: &str, organization: &str) -> Self {
        let now = Utc::now();
        Self {
            id: JobSpecId::generate(),
            position_id,
            status: JobSpecStatus::Draft,
            title: title.to_string(),
            organization: organization.to_string(),
            description: None,
            responsibilities: None,
            requirements: None,
            primary_skills: Vec::new(),
            secondary_skills: Vec::new(),
            experience: None,
            location: None,
            work_mode: None,
            salary: None,
            raw_input: None,
            audio_ref: None,
            document_ref: None,
            confirmation_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        is_placeholder(&self.title, PLACEHOLDER_TITLE)
    }

    pub fn has_placeholder_organization(&self) -> bool {
        is_placeholder(&self.organization, PLACEHOLDER_ORGANIZATION)
    }

    /// Reason the specification cannot be confirmed yet, if any.
    pub fn confirmation_blocker(&self) -> Option<String> {
        if self.has_placeholder_title() {
            return Some("Give the position a real title before confirming".to_string());
        }
        if self.has_placeholder_organization() {
            return Some("Give the position an organization before confirming".to_string());
        }
        None
    }

    pub fn apply(&mut self, patch: &JobSpecPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(organization) = &patch.organization {
            self.organization = organization.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(responsibilities) = &patch.responsibilities {
            self.responsibilities = Some(responsibilities.clone());
        }
        if let Some(requirements) = &patch.requirements {
            self.requirements = Some(requirements.clone());
        }
        if let Some(skills) = &patch.primary_skills {
            self.primary_skills = skills.clone();
        }
        if let Some(skills) = &patch.secondary_skills {
            self.secondary_skills = skills.clone();
        }
        if let Some(experience) = patch.experience {
            self.experience = Some(experience);
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
        if let Some(work_mode) = patch.work_mode {
            self.work_mode = Some(work_mode);
        }
        if let Some(salary) = patch.salary {
            self.salary = Some(salary);
        }
        self.updated_at = Utc::now();
    }
}

fn is_placeholder(value: &str, sentinel: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(sentinel)
}

/// Editable fields of a job specification. Status is deliberately absent:
/// it only moves through confirm/advance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpecPatch {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub description: Option<String>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub primary_skills: Option<Vec<String>>,
    pub secondary_skills: Option<Vec<String>>,
    pub experience: Option<ExperienceRange>,
    pub location: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub salary: Option<SalaryRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_moves_forward() {
        assert!(JobSpecStatus::Draft.can_advance_to(JobSpecStatus::Confirmed));
        assert!(JobSpecStatus::Confirmed.can_advance_to(JobSpecStatus::Archived));
        assert!(!JobSpecStatus::Searching.can_advance_to(JobSpecStatus::Confirmed));
        assert!(!JobSpecStatus::Draft.can_advance_to(JobSpecStatus::Draft));
        assert!(!JobSpecStatus::Draft.can_advance_to(JobSpecStatus::Searching));
        assert!(!JobSpecStatus::Draft.can_advance_to(JobSpecStatus::Completed));
        assert!(JobSpecStatus::Draft.can_advance_to(JobSpecStatus::Archived));
    }

    #[test]
    fn test_placeholder_blocks_confirmation() {
        let spec = JobSpecification::draft(PositionId::generate(), "New Position", "Acme");
        assert!(spec.confirmation_blocker().is_some());

        let spec = JobSpecification::draft(PositionId::generate(), "Engineer", " ");
        assert!(spec.confirmation_blocker().is_some());

        let spec = JobSpecification::draft(PositionId::generate(), "Engineer", "Acme");
        assert!(spec.confirmation_blocker().is_none());
    }

    #[test]
    fn test_ranges_are_normalised() {
        let range = ExperienceRange::new(8, 3);
        assert_eq!((range.min_years, range.max_years), (3, 8));
        let salary = SalaryRange::usd(200_000, 150_000);
        assert_eq!((salary.min, salary.max), (150_000, 200_000));
    }
}
