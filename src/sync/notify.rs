use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use strum_macros::AsRefStr;
use utoipa::ToSchema;

use crate::error::AppError;

/// Oldest notifications are dropped past this many.
const MAX_PENDING: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
}

/// Transient, dismissible message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    items: VecDeque<Notification>,
}

#[derive(Default)]
pub struct Notifications {
    queue: Mutex<Queue>,
}

impl Notifications {
    fn push(&self, title: &str, description: String, variant: Variant) {
        let Ok(mut queue) = self.queue.lock() else {
            return;
        };
        queue.next_id += 1;
        let id = queue.next_id;
        queue.items.push_back(Notification {
            id,
            title: title.to_string(),
            description,
            variant,
        });
        while queue.items.len() > MAX_PENDING {
            queue.items.pop_front();
        }
    }

    pub fn success(&self, title: &str, description: impl Into<String>) {
        self.push(title, description.into(), Variant::Default);
    }

    pub fn error(&self, title: &str, description: impl Into<String>) {
        self.push(title, description.into(), Variant::Destructive);
    }

    /// Reports a failed operation. Remote failures show `fallback`, the
    /// technical detail only goes to the log.
    pub fn failure(&self, err: &AppError, fallback: &str) {
        let description = match err {
            AppError::Data(_) | AppError::Storage(_) => fallback.to_string(),
            other => other.to_string(),
        };
        self.error("Error", description);
    }

    pub fn pending(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .map(|q| q.items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Hands out everything queued and clears the queue.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .map(|mut q| q.items.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let Ok(mut queue) = self.queue.lock() else {
            return false;
        };
        let before = queue.items.len();
        queue.items.retain(|n| n.id != id);
        queue.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismiss_removes_single_notification() {
        let notes = Notifications::default();
        notes.success("Task Updated", "Task marked as completed");
        notes.error("Error", "Failed to update task");

        let pending = notes.pending();
        assert_eq!(pending.len(), 2);
        assert!(notes.dismiss(pending[0].id));
        assert!(!notes.dismiss(pending[0].id));

        let rest = notes.drain();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].variant, Variant::Destructive);
        assert!(notes.pending().is_empty());
    }

    #[test]
    fn remote_failures_use_fallback_text() {
        let notes = Notifications::default();
        let err = AppError::Data(crate::backend::BackendError::NotAuthenticated);
        notes.failure(&err, "Failed to fetch tasks");
        notes.failure(&AppError::Conflict("Already checked in today".into()), "Failed to check in");

        let pending = notes.drain();
        assert_eq!(pending[0].description, "Failed to fetch tasks");
        assert_eq!(pending[1].description, "Already checked in today");
    }

    #[test]
    fn queue_is_bounded() {
        let notes = Notifications::default();
        for i in 0..(MAX_PENDING + 5) {
            notes.success("n", i.to_string());
        }
        let pending = notes.pending();
        assert_eq!(pending.len(), MAX_PENDING);
        assert_eq!(pending[0].description, "5");
    }
}
