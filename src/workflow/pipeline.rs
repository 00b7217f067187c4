// src/workflow/pipeline.rs
//! The extraction port and its scripted, timed stand-in

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::heuristics::{apply_extraction, build_plan, extract_fields, refine_plan, refinement_patch};
use crate::core::{PipelineConfig, ScriptedStep};
use crate::error::WorkflowResult;
use crate::types::{JobSpecification, SearchPlan};

/// Where a position's processing run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Confirming,
    Announcing { step: usize, total: usize },
    Producing,
    AwaitingConfirmation,
    Searching,
}

impl PipelineState {
    /// States that still have scheduled work which a switch must cancel.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Confirming | Self::Announcing { .. } | Self::Producing
        )
    }
}

#[derive(Debug, Clone)]
pub enum ExtractionMode {
    Initial,
    Refine { previous: SearchPlan },
}

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Specification as it stood when the run started.
    pub spec: JobSpecification,
    pub text: String,
    pub mode: ExtractionMode,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub spec: JobSpecification,
    pub plan: SearchPlan,
}

/// Receives progress from an extractor. Every call fails with
/// `WorkflowError::Cancelled` once the run has been superseded, which the
/// extractor propagates to stop early.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn announce(&self, step: usize, total: usize, message: &str) -> WorkflowResult<()>;
    async fn producing(&self) -> WorkflowResult<()>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        request: ExtractionRequest,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult<Extraction>;
}

/// Announces a fixed script of steps on a timer, then derives the
/// specification fields and plan with keyword heuristics.
#[derive(Debug, Clone)]
pub struct ScriptedExtractor {
    steps: Vec<ScriptedStep>,
    final_delay: Duration,
    refine_delay: Duration,
}

impl ScriptedExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            final_delay: config.final_delay,
            refine_delay: config.refine_delay,
        }
    }

    /// Total virtual time an initial run takes before the preview appears.
    pub fn initial_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum::<Duration>() + self.final_delay
    }

    pub fn refine_duration(&self) -> Duration {
        self.refine_delay
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        request: ExtractionRequest,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult<Extraction> {
        let ExtractionRequest {
            mut spec,
            text,
            mode,
        } = request;

        match mode {
            ExtractionMode::Initial => {
                let total = self.steps.len();
                for (i, step) in self.steps.iter().enumerate() {
                    tokio::time::sleep(step.delay).await;
                    progress.announce(i + 1, total, &step.message).await?;
                }
                tokio::time::sleep(self.final_delay).await;
                progress.producing().await?;

                apply_extraction(&mut spec, &extract_fields(&text));
                spec.raw_input = Some(text.trim().to_string());
                let plan = build_plan(&spec, &text);
                debug!("Produced plan for {} with {} companies", spec.id, plan.target_companies.len());
                Ok(Extraction { spec, plan })
            }
            ExtractionMode::Refine { previous } => {
                tokio::time::sleep(self.refine_delay).await;
                progress.producing().await?;

                apply_extraction(&mut spec, &refinement_patch(&text));
                let plan = refine_plan(&previous, &spec, &text);
                debug!("Refined plan for {} to revision {}", spec.id, plan.revision);
                Ok(Extraction { spec, plan })
            }
        }
    }
}
