use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::api::outcome;
use crate::auth::auth::Authed;
use crate::error::AppError;
use crate::model::identity::Identity;
use crate::model::task::{NewTask, Task, TaskPriority, TaskStatus};
use crate::session::SessionContext;

/// A task as listed on a page, with its deadline flags.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskCard {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
    pub due_today: bool,
}

impl TaskCard {
    pub fn new(task: Task, today: NaiveDate) -> Self {
        Self {
            overdue: task.is_overdue(today),
            due_today: task.is_due_on(today),
            task,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl TaskCounts {
    pub fn of(tasks: &[Task], today: NaiveDate) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        Self {
            total: tasks.len(),
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed: count(TaskStatus::Completed),
            overdue: tasks.iter().filter(|t| t.is_overdue(today)).count(),
        }
    }
}

/// Filters of the task pages. Absent means "all".
#[derive(Debug, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    /// Reads the `status` / `priority` query values; `all` or anything unknown disables the filter.
    pub fn parse(status: Option<&str>, priority: Option<&str>) -> Self {
        Self {
            status: status.and_then(|s| s.parse().ok()),
            priority: priority.and_then(|p| p.parse().ok()),
        }
    }

    fn keeps(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
    }
}

#[derive(Serialize, ToSchema)]
pub struct MyTasksView {
    pub tasks: Vec<TaskCard>,
    pub counts: TaskCounts,
    pub loading: bool,
}

pub async fn my_tasks_view(
    ctx: &SessionContext,
    identity: &Identity,
    filter: &TaskFilter,
) -> MyTasksView {
    let today = ctx.attendance.today_date();
    let tasks = ctx.tasks.fetch(identity).await;

    MyTasksView {
        counts: TaskCounts::of(&tasks, today),
        tasks: tasks
            .into_iter()
            .filter(|t| filter.keeps(t))
            .map(|t| TaskCard::new(t, today))
            .collect(),
        loading: ctx.tasks.is_loading(),
    }
}

#[derive(Serialize, ToSchema)]
pub struct Assignee {
    pub user_id: String,
    pub full_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct TaskManagerView {
    pub tasks: Vec<TaskCard>,
    pub counts: TaskCounts,
    pub assignees: Vec<Assignee>,
}

pub async fn task_manager_view(
    ctx: &SessionContext,
    identity: &Identity,
    filter: &TaskFilter,
) -> TaskManagerView {
    let today = ctx.attendance.today_date();
    let tasks = ctx.tasks.fetch_all(identity).await;
    let assignees = ctx
        .profile
        .fetch_all(identity)
        .await
        .into_iter()
        .map(|p| Assignee {
            user_id: p.user_id,
            full_name: p.full_name,
        })
        .collect();

    TaskManagerView {
        counts: TaskCounts::of(&tasks, today),
        tasks: tasks
            .into_iter()
            .filter(|t| filter.keeps(t))
            .map(|t| TaskCard::new(t, today))
            .collect(),
        assignees,
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    /// Ignored (forced to 100) when `status` is `completed`.
    pub progress: Option<u8>,
}

/// Update status and progress of an assigned task
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/status",
    params(("id" = String, Path, description = "Task id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Task updated", body = Object, example = json!({
            "ok": true,
            "data": { "id": "…", "status": "completed", "progress": 100 },
            "notifications": [{ "id": 1, "title": "Task Updated", "description": "Task marked as completed", "variant": "default" }]
        })),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Update rejected; see notifications")
    ),
    tag = "Tasks"
)]
pub async fn update_status(
    auth: Authed,
    path: web::Path<String>,
    body: web::Json<StatusUpdate>,
) -> HttpResponse {
    let task_id = path.into_inner();
    if auth.tasks.tasks().is_empty() {
        // a page reload may have left the cache cold
        auth.tasks.fetch(&auth.identity).await;
    }
    let task = auth
        .tasks
        .update_status(&auth.identity, &task_id, body.status, body.progress)
        .await;
    outcome(&auth, task)
}

/// Create a task (admin)
#[utoipa::path(
    post,
    path = "/api/admin/tasks",
    request_body = NewTask,
    responses(
        (status = 200, description = "Task created", body = Object, example = json!({
            "ok": true,
            "data": { "id": "…", "title": "Quarterly report", "status": "pending", "progress": 0 },
            "notifications": [{ "id": 1, "title": "Task Created", "description": "New task has been created successfully", "variant": "default" }]
        })),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Creation rejected; see notifications")
    ),
    tag = "Admin"
)]
pub async fn create_task(
    auth: Authed,
    body: web::Json<NewTask>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let task = auth.tasks.create(&auth.identity, body.into_inner()).await;
    Ok(outcome(&auth, task))
}

/// Delete a task (admin)
#[utoipa::path(
    delete,
    path = "/api/admin/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Deletion failed; see notifications")
    ),
    tag = "Admin"
)]
pub async fn delete_task(
    auth: Authed,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let task_id = path.into_inner();
    let deleted = auth.tasks.delete(&auth.identity, &task_id).await;
    Ok(outcome(&auth, deleted.then(|| json!({ "id": task_id }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(status: TaskStatus, priority: TaskPriority, deadline: Option<NaiveDate>) -> Task {
        Task {
            id: "t".into(),
            title: "t".into(),
            description: None,
            assigned_to: "u1".into(),
            assigned_by: "a1".into(),
            priority,
            status,
            deadline,
            progress: if status == TaskStatus::Completed { 100 } else { 0 },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn counts_cover_each_status_and_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = today.pred_opt();
        let tasks = vec![
            task(TaskStatus::Pending, TaskPriority::High, yesterday),
            task(TaskStatus::InProgress, TaskPriority::Low, Some(today)),
            task(TaskStatus::Completed, TaskPriority::Low, yesterday),
        ];

        assert_eq!(
            TaskCounts::of(&tasks, today),
            TaskCounts {
                total: 3,
                pending: 1,
                in_progress: 1,
                completed: 1,
                overdue: 1
            }
        );
        assert!(TaskCard::new(tasks[1].clone(), today).due_today);
    }

    #[test]
    fn filter_combines_status_and_priority() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            priority: Some(TaskPriority::High),
        };
        assert!(filter.keeps(&task(TaskStatus::Pending, TaskPriority::High, None)));
        assert!(!filter.keeps(&task(TaskStatus::Pending, TaskPriority::Low, None)));
        assert!(TaskFilter::default().keeps(&task(TaskStatus::Completed, TaskPriority::Low, None)));

        let parsed = TaskFilter::parse(Some("in_progress"), Some("all"));
        assert_eq!(parsed.status, Some(TaskStatus::InProgress));
        assert_eq!(parsed.priority, None);
    }
}
