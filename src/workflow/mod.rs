// src/workflow/mod.rs
//! The position workflow: stores, pipeline and the orchestrator tying them
//! together

pub mod candidates;
pub mod conversation_log;
pub mod feedback;
pub mod heuristics;
pub mod job_spec;
pub mod orchestrator;
pub mod pipeline;
pub mod position_store;
pub mod search;

pub use candidates::{CandidateCollection, MatchFilter};
pub use conversation_log::ConversationLog;
pub use feedback::FeedbackRecorder;
pub use job_spec::JobSpecService;
pub use orchestrator::{Collaborators, PositionSnapshot, Upload, ViewMode, Workflow};
pub use pipeline::{
    Extraction, ExtractionMode, ExtractionRequest, Extractor, PipelineState, ProgressSink,
    ScriptedExtractor,
};
pub use position_store::PositionStore;
pub use search::{CandidateSource, SampleCandidateSource};

use crate::core::Notifier;
use crate::error::{StoreResult, WorkflowResult};

/// Turn a store failure into a user-visible error notification.
pub(crate) fn surface<T>(
    notifier: &dyn Notifier,
    title: &str,
    result: StoreResult<T>,
) -> WorkflowResult<T> {
    result.map_err(|e| {
        notifier.error(title, &e.to_string());
        e.into()
    })
}
