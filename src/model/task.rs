use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::backend::{BackendError, Row, decode_row};

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Human label used in notifications, e.g. "in progress".
    pub fn label(&self) -> String {
        self.as_ref().replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub assigned_by: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[schema(value_type = Option<String>, format = "date")]
    pub deadline: Option<NaiveDate>,
    pub progress: u8,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed && self.deadline.is_some_and(|d| d < today)
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.deadline == Some(day)
    }
}

impl TryFrom<Row> for Task {
    type Error = BackendError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let task: Task = decode_row("tasks", row)?;

        if task.progress > 100 {
            return Err(BackendError::Decode {
                table: "tasks",
                message: format!("task {} has progress {}", task.id, task.progress),
            });
        }
        if task.status == TaskStatus::Completed && task.progress != 100 {
            return Err(BackendError::Decode {
                table: "tasks",
                message: format!("completed task {} reports progress {}", task.id, task.progress),
            });
        }

        Ok(task)
    }
}

/// Fields an admin supplies when creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub priority: TaskPriority,
    #[schema(value_type = Option<String>, format = "date")]
    pub deadline: Option<NaiveDate>,
}

/// Status change requested by an assignee. Completing a task always means 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl StatusChange {
    pub fn new(status: TaskStatus, progress: Option<u8>) -> Self {
        let progress = match status {
            TaskStatus::Completed => Some(100),
            _ => progress,
        };
        StatusChange { status, progress }
    }

    pub fn apply(&self, task: &mut Task) {
        task.status = self.status;
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_forces_full_progress() {
        assert_eq!(StatusChange::new(TaskStatus::Completed, Some(40)).progress, Some(100));
        assert_eq!(StatusChange::new(TaskStatus::Completed, None).progress, Some(100));
        assert_eq!(StatusChange::new(TaskStatus::InProgress, Some(40)).progress, Some(40));
        assert_eq!(StatusChange::new(TaskStatus::Pending, None).progress, None);
    }

    #[test]
    fn status_label_reads_naturally() {
        assert_eq!(TaskStatus::InProgress.label(), "in progress");
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn overdue_ignores_completed_tasks() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut task = Task {
            id: "t1".into(),
            title: "Docs".into(),
            description: None,
            assigned_to: "u1".into(),
            assigned_by: "a1".into(),
            priority: TaskPriority::Low,
            status: TaskStatus::Pending,
            deadline: NaiveDate::from_ymd_opt(2026, 3, 9),
            progress: 0,
            created_at: Utc::now(),
        };
        assert!(task.is_overdue(today));

        StatusChange::new(TaskStatus::Completed, None).apply(&mut task);
        assert!(!task.is_overdue(today));
        assert_eq!(task.progress, 100);
    }
}
