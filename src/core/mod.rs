// src/core/mod.rs
//! Infrastructure behind the workflow: configuration, persistence, uploads
//! and notifications

pub mod config_manager;
pub mod database;
pub mod fs_ops;
pub mod memory_store;
pub mod notifier;
pub mod ports;

pub use config_manager::{ConfigManager, PipelineConfig, ScriptedStep};
pub use database::Database;
pub use fs_ops::{FsOps, LocalBlobStore};
pub use memory_store::{MemoryStore, Operation};
pub use notifier::{LogNotifier, Notification, NotificationFeed, Notifier, Severity};
pub use ports::{BlobStore, RecruitingStore};
