//! Conversational hiring workflow.
//!
//! A recruiter opens a position, describes the role in free text (or a voice
//! memo), watches a scripted pipeline turn the description into a job
//! specification and search plan, refines or confirms it, and reviews the
//! ranked candidates that come back.

pub mod cli;
pub mod core;
pub mod error;
pub mod types;
pub mod web;
pub mod workflow;

pub use error::{StoreError, WorkflowError};
pub use web::start_web_server;
pub use workflow::{Collaborators, PositionSnapshot, ViewMode, Workflow};
