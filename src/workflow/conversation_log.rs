// src/workflow/conversation_log.rs
//! Per-position, append-only conversation turns held for the session

use std::collections::HashMap;

use crate::types::{ConversationTurn, PositionId, TurnId};

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: HashMap<PositionId, Vec<ConversationTurn>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns in append order; empty for unknown positions.
    pub fn get(&self, position_id: &PositionId) -> &[ConversationTurn] {
        self.turns
            .get(position_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn append(&mut self, turn: ConversationTurn) -> TurnId {
        let id = turn.id.clone();
        self.turns
            .entry(turn.position_id.clone())
            .or_default()
            .push(turn);
        id
    }

    /// Drop every turn of a position. Returns how many were removed.
    pub fn clear(&mut self, position_id: &PositionId) -> usize {
        self.turns
            .remove(position_id)
            .map(|turns| turns.len())
            .unwrap_or(0)
    }

    pub fn has_started(&self, position_id: &PositionId) -> bool {
        !self.get(position_id).is_empty()
    }

    /// Clear the pending flag of every outstanding turn of a position.
    pub fn settle_pending(&mut self, position_id: &PositionId) -> usize {
        self.turns
            .get_mut(position_id)
            .map(|turns| {
                turns
                    .iter_mut()
                    .filter(|t| t.pending)
                    .map(|t| t.settle())
                    .filter(|settled| *settled)
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TurnKind;

    #[test]
    fn test_append_order_and_isolation() {
        let mut log = ConversationLog::new();
        let a = PositionId::from("a");
        let b = PositionId::from("b");

        log.append(ConversationTurn::user_input(a.clone(), "first", None));
        log.append(ConversationTurn::user_input(b.clone(), "other", None));
        log.append(ConversationTurn::confirmation(a.clone(), "second"));
        log.append(ConversationTurn::progress(a.clone(), 1, 2, "third"));

        let texts: Vec<_> = log.get(&a).iter().map(|t| t.body.display_text()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(log.get(&b).len(), 1);

        assert_eq!(log.clear(&a), 3);
        assert!(log.get(&a).is_empty());
        assert_eq!(log.get(&b)[0].kind(), TurnKind::UserInput);
    }

    #[test]
    fn test_has_started_tracks_emptiness() {
        let mut log = ConversationLog::new();
        let position = PositionId::from("p");
        assert!(!log.has_started(&position));
        log.append(ConversationTurn::user_input(position.clone(), "hi", None));
        assert!(log.has_started(&position));
        log.clear(&position);
        assert!(!log.has_started(&position));
    }

    #[test]
    fn test_settle_pending_only_touches_pending_turns() {
        let mut log = ConversationLog::new();
        let position = PositionId::from("p");
        log.append(ConversationTurn::user_input(position.clone(), "hi", None));
        log.append(ConversationTurn::confirmation(position.clone(), "ok"));
        log.append(ConversationTurn::progress(position.clone(), 1, 1, "step"));

        assert_eq!(log.settle_pending(&position), 2);
        assert!(log.get(&position).iter().all(|t| !t.pending));
        assert_eq!(log.settle_pending(&position), 0);
    }
}
