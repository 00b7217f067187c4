// src/core/notifier.rs
//! User-facing notifications (the toast surface)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: &str, description: &str, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity,
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn error(&self, title: &str, description: &str) {
        self.notify(Notification::new(title, description, Severity::Error));
    }

    fn warning(&self, title: &str, description: &str) {
        self.notify(Notification::new(title, description, Severity::Warning));
    }

    fn success(&self, title: &str, description: &str) {
        self.notify(Notification::new(title, description, Severity::Success));
    }
}

fn log_notification(notification: &Notification) {
    match notification.severity {
        Severity::Error => error!("{}: {}", notification.title, notification.description),
        Severity::Warning => warn!("{}: {}", notification.title, notification.description),
        Severity::Info | Severity::Success => {
            info!("{}: {}", notification.title, notification.description)
        }
    }
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);
    }
}

/// Keeps the most recent notifications in memory so a client can poll them.
#[derive(Debug)]
pub struct NotificationFeed {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.entries().iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.entries().drain(..).collect()
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);
        let mut entries = self.entries();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_keeps_most_recent() {
        let feed = NotificationFeed::new(2);
        feed.error("first", "a");
        feed.warning("second", "b");
        feed.success("third", "c");

        let titles: Vec<_> = feed.recent().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["second", "third"]);
    }

    #[test]
    fn test_drain_empties_feed() {
        let feed = NotificationFeed::new(4);
        feed.error("failed", "boom");
        assert_eq!(feed.drain().len(), 1);
        assert!(feed.recent().is_empty());
    }
}
