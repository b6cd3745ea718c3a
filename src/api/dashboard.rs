use serde::Serialize;
use utoipa::ToSchema;

use crate::api::tasks::TaskCard;
use crate::model::attendance::AttendanceRecord;
use crate::model::identity::Identity;
use crate::model::task::{Task, TaskStatus};
use crate::session::SessionContext;

/// Tasks shown on the dashboard.
const RECENT_TASKS: usize = 3;

#[derive(Serialize, ToSchema)]
pub struct UserDashboard {
    pub checked_in: bool,
    /// Local `HH:MM` of today's check-in.
    pub check_in_time: Option<String>,
    pub today: Option<AttendanceRecord>,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub due_today: usize,
    /// Whole percent of completed tasks, `0` without tasks.
    pub completion_rate: u32,
    pub total_tasks: usize,
    pub recent_tasks: Vec<TaskCard>,
    pub loading: bool,
}

pub fn completion_rate(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    (completed as f64 / tasks.len() as f64 * 100.0).round() as u32
}

pub async fn user_dashboard(ctx: &SessionContext, identity: &Identity) -> UserDashboard {
    let today = ctx.attendance.refresh_today(identity).await;
    let tasks = ctx.tasks.fetch(identity).await;
    let date = ctx.attendance.today_date();
    let workday = ctx.attendance.workday();

    let completed_tasks = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();

    UserDashboard {
        checked_in: ctx.attendance.is_checked_in(),
        check_in_time: today.as_ref().map(|r| workday.local_time(r.check_in, "%H:%M")),
        today,
        active_tasks: tasks.len() - completed_tasks,
        completed_tasks,
        due_today: tasks.iter().filter(|t| t.is_due_on(date)).count(),
        completion_rate: completion_rate(&tasks),
        total_tasks: tasks.len(),
        recent_tasks: tasks
            .iter()
            .take(RECENT_TASKS)
            .cloned()
            .map(|t| TaskCard::new(t, date))
            .collect(),
        loading: ctx.attendance.is_loading() || ctx.tasks.is_loading(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::backend::Table;
    use crate::backend::memory::MemoryBackend;
    use crate::config::Config;
    use crate::model::task::TaskPriority;
    use crate::testing::signed_in;
    use crate::utils::clock::ManualClock;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: "t".into(),
            title: "t".into(),
            description: None,
            assigned_to: "u1".into(),
            assigned_by: "a1".into(),
            priority: TaskPriority::Medium,
            status,
            deadline: None,
            progress: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn completion_rate_rounds_to_whole_percent() {
        assert_eq!(completion_rate(&[]), 0);
        let tasks = vec![
            task(TaskStatus::Completed),
            task(TaskStatus::Pending),
            task(TaskStatus::InProgress),
        ];
        assert_eq!(completion_rate(&tasks), 33);
        assert_eq!(completion_rate(&tasks[..2]), 50);
    }

    #[tokio::test]
    async fn dashboard_reflects_check_in_and_tasks() {
        let backend = MemoryBackend::new();
        let (client, identity) = signed_in(&backend, "alice@x.com", "user").await;
        for (i, (status, deadline)) in [
            ("pending", "2026-03-02"),
            ("completed", "2026-03-01"),
            ("in_progress", "2026-03-09"),
            ("pending", "2026-03-20"),
        ]
        .into_iter()
        .enumerate()
        {
            let row = json!({
                "id": format!("t{i}"),
                "title": format!("Task {i}"),
                "assigned_to": identity.id,
                "assigned_by": "a1",
                "priority": "medium",
                "status": status,
                "deadline": deadline,
                "progress": if status == "completed" { 100 } else { 0 },
                "created_at": format!("2026-02-0{}T10:00:00Z", i + 1),
            });
            backend.seed_row(Table::Tasks, row.as_object().cloned().unwrap());
        }

        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap());
        let ctx = SessionContext::open("s1".into(), client, &Config::for_tests(), Arc::new(clock));
        ctx.attendance.check_in(&identity).await.unwrap();

        let view = user_dashboard(&ctx, &identity).await;
        assert!(view.checked_in);
        assert_eq!(view.check_in_time.as_deref(), Some("08:30"));
        assert_eq!(view.total_tasks, 4);
        assert_eq!(view.active_tasks, 3);
        assert_eq!(view.completed_tasks, 1);
        assert_eq!(view.due_today, 1);
        assert_eq!(view.completion_rate, 25);
        assert_eq!(view.recent_tasks.len(), 3);
        // newest created first
        assert_eq!(view.recent_tasks[0].task.id, "t3");
    }
}
