// src/workflow/position_store.rs
//! Position CRUD with an in-memory list kept in step with persistence

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::surface;
use crate::core::{Notifier, RecruitingStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{Position, PositionId, PositionPatch};

pub struct PositionStore {
    store: Arc<dyn RecruitingStore>,
    notifier: Arc<dyn Notifier>,
    positions: RwLock<Vec<Position>>,
}

impl PositionStore {
    pub fn new(store: Arc<dyn RecruitingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            positions: RwLock::new(Vec::new()),
        }
    }

    /// Replace the local list with what persistence holds.
    pub async fn refresh(&self) -> WorkflowResult<Vec<Position>> {
        let positions = surface(
            self.notifier.as_ref(),
            "Failed to load positions",
            self.store.list_positions().await,
        )?;
        *self.positions.write().await = positions.clone();
        Ok(positions)
    }

    pub async fn list(&self) -> Vec<Position> {
        self.positions.read().await.clone()
    }

    pub async fn get(&self, id: &PositionId) -> Option<Position> {
        self.positions
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned()
    }

    pub async fn create(&self, title: &str, organization: &str) -> WorkflowResult<PositionId> {
        let position = Position::new(title, organization);
        surface(
            self.notifier.as_ref(),
            "Failed to create position",
            self.store.insert_position(&position).await,
        )?;
        info!("Created position {} ({})", position.id, position.title);

        match self.store.list_positions().await {
            Ok(all) => *self.positions.write().await = all,
            Err(e) => {
                warn!("Reload after create failed, keeping local copy: {}", e);
                self.positions.write().await.insert(0, position.clone());
            }
        }
        Ok(position.id)
    }

    /// Persist first, then patch the local copy.
    pub async fn update(&self, id: &PositionId, patch: &PositionPatch) -> WorkflowResult<Position> {
        let current = self
            .get(id)
            .await
            .ok_or_else(|| WorkflowError::not_found(format!("position {}", id)))?;
        let next = current.patched(patch);

        let updated = surface(
            self.notifier.as_ref(),
            "Failed to update position",
            self.store.update_position(&next).await,
        )?;
        if !updated {
            self.notifier
                .error("Failed to update position", "The position no longer exists");
            return Err(WorkflowError::not_found(format!("position {}", id)));
        }

        let mut positions = self.positions.write().await;
        if let Some(slot) = positions.iter_mut().find(|p| &p.id == id) {
            *slot = next.clone();
        }
        Ok(next)
    }

    /// Persist first, then drop the local copy. Conversation turns and job
    /// specifications are the caller's to clean up.
    pub async fn delete(&self, id: &PositionId) -> WorkflowResult<()> {
        let deleted = surface(
            self.notifier.as_ref(),
            "Failed to delete position",
            self.store.delete_position(id).await,
        )?;
        self.positions.write().await.retain(|p| &p.id != id);

        if deleted {
            info!("Deleted position {}", id);
            Ok(())
        } else {
            self.notifier
                .error("Failed to delete position", "The position no longer exists");
            Err(WorkflowError::not_found(format!("position {}", id)))
        }
    }
}
