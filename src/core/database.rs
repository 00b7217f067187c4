// src/core/database.rs
//! SQLite persistence for positions, job specifications, matches, feedback
//! and chat history

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::ports::RecruitingStore;
use crate::core::FsOps;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    CandidateMatch, ChatHistoryEntry, DiscoveryChannel, ExperienceRange, FeedbackRecord,
    JobSpecId, JobSpecStatus, JobSpecification, MatchId, MatchStatus, Position, PositionId,
    PositionStatus, SalaryRange, SubScores, WorkMode,
};

// ===== Connection Management =====

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            FsOps::ensure_dir_exists(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database, mostly for tests and demos.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                organization TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'in_progress', 'completed')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS job_specifications (
                id TEXT PRIMARY KEY,
                position_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                title TEXT NOT NULL,
                organization TEXT NOT NULL,
                details TEXT NOT NULL,
                raw_input TEXT,
                audio_ref TEXT,
                document_ref TEXT,
                confirmation_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS candidate_matches (
                id TEXT PRIMARY KEY,
                job_spec_id TEXT NOT NULL,
                candidate_ref TEXT NOT NULL,
                display_name TEXT NOT NULL,
                current_title TEXT,
                current_company TEXT,
                channel TEXT NOT NULL,
                skills_score INTEGER NOT NULL,
                experience_score INTEGER NOT NULL,
                location_score INTEGER NOT NULL,
                company_score INTEGER NOT NULL,
                overall_score INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                score_breakdown TEXT,
                created_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS recruiter_feedback (
                id TEXT PRIMARY KEY,
                match_id TEXT NOT NULL,
                job_spec_id TEXT NOT NULL,
                decision TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                position_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                attachment_path TEXT,
                created_at TEXT NOT NULL
            );
            "#,
            "CREATE INDEX IF NOT EXISTS idx_job_specs_position ON job_specifications(position_id);",
            "CREATE INDEX IF NOT EXISTS idx_matches_job_spec ON candidate_matches(job_spec_id);",
            "CREATE INDEX IF NOT EXISTS idx_feedback_job_spec ON recruiter_feedback(job_spec_id);",
            "CREATE INDEX IF NOT EXISTS idx_chat_history_position ON chat_history(position_id);",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Database migration failed")?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

// ===== Row Mapping =====

fn parse_column<T: FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    value.parse::<T>().map_err(StoreError::Corrupt)
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    id: String,
    title: String,
    organization: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PositionRow> for Position {
    type Error = StoreError;

    fn try_from(row: PositionRow) -> StoreResult<Self> {
        Ok(Self {
            id: PositionId::from(row.id),
            title: row.title,
            organization: row.organization,
            status: parse_column::<PositionStatus>(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Structured job specification fields kept as one JSON column.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JobSpecDetails {
    description: Option<String>,
    responsibilities: Option<String>,
    requirements: Option<String>,
    #[serde(default)]
    primary_skills: Vec<String>,
    #[serde(default)]
    secondary_skills: Vec<String>,
    experience: Option<ExperienceRange>,
    location: Option<String>,
    work_mode: Option<WorkMode>,
    salary: Option<SalaryRange>,
}

impl JobSpecDetails {
    fn of(spec: &JobSpecification) -> Self {
        Self {
            description: spec.description.clone(),
            responsibilities: spec.responsibilities.clone(),
            requirements: spec.requirements.clone(),
            primary_skills: spec.primary_skills.clone(),
            secondary_skills: spec.secondary_skills.clone(),
            experience: spec.experience,
            location: spec.location.clone(),
            work_mode: spec.work_mode,
            salary: spec.salary,
        }
    }
}

#[derive(sqlx::FromRow)]
struct JobSpecRow {
    id: String,
    position_id: String,
    status: String,
    title: String,
    organization: String,
    details: String,
    raw_input: Option<String>,
    audio_ref: Option<String>,
    document_ref: Option<String>,
    confirmation_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobSpecRow> for JobSpecification {
    type Error = StoreError;

    fn try_from(row: JobSpecRow) -> StoreResult<Self> {
        let details: JobSpecDetails = serde_json::from_str(&row.details)?;
        Ok(Self {
            id: JobSpecId::from(row.id),
            position_id: PositionId::from(row.position_id),
            status: parse_column::<JobSpecStatus>(&row.status)?,
            title: row.title,
            organization: row.organization,
            description: details.description,
            responsibilities: details.responsibilities,
            requirements: details.requirements,
            primary_skills: details.primary_skills,
            secondary_skills: details.secondary_skills,
            experience: details.experience,
            location: details.location,
            work_mode: details.work_mode,
            salary: details.salary,
            raw_input: row.raw_input,
            audio_ref: row.audio_ref,
            document_ref: row.document_ref,
            confirmation_notes: row.confirmation_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: String,
    job_spec_id: String,
    candidate_ref: String,
    display_name: String,
    current_title: Option<String>,
    current_company: Option<String>,
    channel: String,
    skills_score: i64,
    experience_score: i64,
    location_score: i64,
    company_score: i64,
    overall_score: i64,
    status: String,
    score_breakdown: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for CandidateMatch {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> StoreResult<Self> {
        let score_breakdown = row
            .score_breakdown
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?;
        Ok(Self {
            id: MatchId::from(row.id),
            job_spec_id: JobSpecId::from(row.job_spec_id),
            candidate_ref: row.candidate_ref,
            display_name: row.display_name,
            current_title: row.current_title,
            current_company: row.current_company,
            channel: parse_column::<DiscoveryChannel>(&row.channel)?,
            scores: SubScores::new(
                row.skills_score,
                row.experience_score,
                row.location_score,
                row.company_score,
            ),
            overall_score: crate::types::clamp_percentage(row.overall_score),
            status: parse_column::<MatchStatus>(&row.status)?,
            score_breakdown,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FeedbackRow {
    id: String,
    match_id: String,
    job_spec_id: String,
    decision: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            match_id: MatchId::from(row.match_id),
            job_spec_id: JobSpecId::from(row.job_spec_id),
            decision: parse_column::<MatchStatus>(&row.decision)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

// ===== Store Implementation =====

#[async_trait]
impl RecruitingStore for Database {
    async fn list_positions(&self) -> StoreResult<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            r#"
            SELECT id, title, organization, status, created_at, updated_at
            FROM positions
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Position::try_from).collect()
    }

    async fn insert_position(&self, position: &Position) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (id, title, organization, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.id.as_str())
        .bind(&position.title)
        .bind(&position.organization)
        .bind(position.status.as_str())
        .bind(position.created_at)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("Inserted position {}", position.id);
        Ok(())
    }

    async fn update_position(&self, position: &Position) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE positions
            SET title = ?, organization = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&position.title)
        .bind(&position.organization)
        .bind(position.status.as_str())
        .bind(position.updated_at)
        .bind(position.id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_position(&self, id: &PositionId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM positions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_job_spec(&self, id: &JobSpecId) -> StoreResult<Option<JobSpecification>> {
        let row = sqlx::query_as::<_, JobSpecRow>(
            r#"
            SELECT id, position_id, status, title, organization, details, raw_input,
                   audio_ref, document_ref, confirmation_notes, created_at, updated_at
            FROM job_specifications
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobSpecification::try_from).transpose()
    }

    async fn find_job_spec_for_position(
        &self,
        position_id: &PositionId,
    ) -> StoreResult<Option<JobSpecification>> {
        let row = sqlx::query_as::<_, JobSpecRow>(
            r#"
            SELECT id, position_id, status, title, organization, details, raw_input,
                   audio_ref, document_ref, confirmation_notes, created_at, updated_at
            FROM job_specifications
            WHERE position_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(position_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobSpecification::try_from).transpose()
    }

    async fn save_job_spec(&self, spec: &JobSpecification) -> StoreResult<()> {
        let details = serde_json::to_string(&JobSpecDetails::of(spec))?;

        sqlx::query(
            r#"
            INSERT INTO job_specifications (
                id, position_id, status, title, organization, details, raw_input,
                audio_ref, document_ref, confirmation_notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                title = excluded.title,
                organization = excluded.organization,
                details = excluded.details,
                raw_input = excluded.raw_input,
                audio_ref = excluded.audio_ref,
                document_ref = excluded.document_ref,
                confirmation_notes = excluded.confirmation_notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(spec.id.as_str())
        .bind(spec.position_id.as_str())
        .bind(spec.status.as_str())
        .bind(&spec.title)
        .bind(&spec.organization)
        .bind(details)
        .bind(&spec.raw_input)
        .bind(&spec.audio_ref)
        .bind(&spec.document_ref)
        .bind(&spec.confirmation_notes)
        .bind(spec.created_at)
        .bind(spec.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("Saved job specification {} ({})", spec.id, spec.status.as_str());
        Ok(())
    }

    async fn list_matches(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<CandidateMatch>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, job_spec_id, candidate_ref, display_name, current_title, current_company,
                   channel, skills_score, experience_score, location_score, company_score,
                   overall_score, status, score_breakdown, created_at
            FROM candidate_matches
            WHERE job_spec_id = ?
            ORDER BY overall_score DESC, rowid ASC
            "#,
        )
        .bind(job_spec_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CandidateMatch::try_from).collect()
    }

    async fn insert_matches(&self, candidates: &[CandidateMatch]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for candidate in candidates {
            let breakdown = candidate
                .score_breakdown
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO candidate_matches (
                    id, job_spec_id, candidate_ref, display_name, current_title, current_company,
                    channel, skills_score, experience_score, location_score, company_score,
                    overall_score, status, score_breakdown, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(candidate.id.as_str())
            .bind(candidate.job_spec_id.as_str())
            .bind(&candidate.candidate_ref)
            .bind(&candidate.display_name)
            .bind(&candidate.current_title)
            .bind(&candidate.current_company)
            .bind(candidate.channel.as_str())
            .bind(i64::from(candidate.scores.skills))
            .bind(i64::from(candidate.scores.experience))
            .bind(i64::from(candidate.scores.location))
            .bind(i64::from(candidate.scores.company))
            .bind(i64::from(candidate.overall_score))
            .bind(candidate.status.as_str())
            .bind(breakdown)
            .bind(candidate.created_at)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping the transaction on an early return rolls it back
        tx.commit().await?;
        debug!("Inserted {} candidate matches", candidates.len());
        Ok(())
    }

    async fn update_match_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE candidate_matches SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiter_feedback (id, match_id, job_spec_id, decision, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.match_id.as_str())
        .bind(record.job_spec_id.as_str())
        .bind(record.decision.as_str())
        .bind(&record.notes)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_feedback(&self, job_spec_id: &JobSpecId) -> StoreResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, match_id, job_spec_id, decision, notes, created_at
            FROM recruiter_feedback
            WHERE job_spec_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(job_spec_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }

    async fn append_chat_history(&self, entry: &ChatHistoryEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_history (position_id, role, content, attachment_path, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.position_id.as_str())
        .bind(&entry.role)
        .bind(&entry.content)
        .bind(&entry.attachment_path)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_chat_history(&self, position_id: &PositionId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM chat_history WHERE position_id = ?")
            .bind(position_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
