use std::sync::{Arc, RwLock};

use chrono::SecondsFormat;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::backend::{DataService, Query, Row, Table, decode_rows};
use crate::error::AppError;
use crate::model::identity::Identity;
use crate::model::task::{NewTask, StatusChange, Task, TaskStatus};
use crate::sync::Loading;
use crate::sync::notify::Notifications;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Tasks assigned to the signed-in user.
    Assigned,
    /// Every task (admin task manager).
    All,
}

impl TaskScope {
    fn includes(&self, identity: &Identity, task: &Task) -> bool {
        match self {
            TaskScope::Assigned => task.assigned_to == identity.id,
            TaskScope::All => true,
        }
    }
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub struct TaskSync {
    data: Arc<dyn DataService>,
    clock: Arc<dyn Clock>,
    notes: Arc<Notifications>,
    loading: Loading,
    cache: RwLock<(TaskScope, Vec<Task>)>,
}

impl TaskSync {
    pub fn new(
        data: Arc<dyn DataService>,
        clock: Arc<dyn Clock>,
        notes: Arc<Notifications>,
    ) -> Self {
        Self {
            data,
            clock,
            notes,
            loading: Loading::default(),
            cache: RwLock::new((TaskScope::Assigned, Vec::new())),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.cache.read().map(|c| c.1.clone()).unwrap_or_default()
    }

    pub fn scope(&self) -> TaskScope {
        self.cache.read().map(|c| c.0).unwrap_or(TaskScope::Assigned)
    }

    pub fn clear(&self) {
        self.store(TaskScope::Assigned, Vec::new());
    }

    fn store(&self, scope: TaskScope, tasks: Vec<Task>) {
        if let Ok(mut cache) = self.cache.write() {
            *cache = (scope, tasks);
        }
    }

    fn now(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn replace_cached(&self, task: &Task) {
        self.with_tasks(|tasks| {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task.clone();
            }
        });
    }

    fn with_tasks(&self, f: impl FnOnce(&mut Vec<Task>)) {
        if let Ok(mut cache) = self.cache.write() {
            f(&mut cache.1);
        }
    }

    async fn load(&self, identity: &Identity, scope: TaskScope) -> Result<Vec<Task>, AppError> {
        let mut query = Query::new();
        if scope == TaskScope::Assigned {
            query = query.eq("assigned_to", identity.id.as_str());
        }
        let rows = self
            .data
            .select(Table::Tasks, &query.order_desc("created_at"))
            .await?;
        Ok(decode_rows(rows))
    }

    async fn fetch_scope(&self, identity: &Identity, scope: TaskScope) -> Vec<Task> {
        let _loading = self.loading.begin();
        match self.load(identity, scope).await {
            Ok(tasks) => {
                self.store(scope, tasks.clone());
                tasks
            }
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Failed to fetch tasks");
                self.notes.failure(&e, "Failed to fetch tasks");
                self.tasks()
            }
        }
    }

    /// Tasks assigned to `identity`, newest first.
    pub async fn fetch(&self, identity: &Identity) -> Vec<Task> {
        self.fetch_scope(identity, TaskScope::Assigned).await
    }

    /// Every task, newest first. Admin only.
    pub async fn fetch_all(&self, identity: &Identity) -> Vec<Task> {
        if !identity.is_admin() {
            self.notes
                .failure(&AppError::Forbidden("Admin only"), "Failed to fetch tasks");
            return self.tasks();
        }
        self.fetch_scope(identity, TaskScope::All).await
    }

    pub async fn update_status(
        &self,
        identity: &Identity,
        task_id: &str,
        status: TaskStatus,
        progress: Option<u8>,
    ) -> Option<Task> {
        match self.try_update_status(identity, task_id, status, progress).await {
            Ok(task) => Some(task),
            Err(e) => {
                error!(error = %e, task_id, "Failed to update task");
                self.notes.failure(&e, "Failed to update task");
                None
            }
        }
    }

    async fn try_update_status(
        &self,
        identity: &Identity,
        task_id: &str,
        status: TaskStatus,
        progress: Option<u8>,
    ) -> Result<Task, AppError> {
        if progress.is_some_and(|p| p > 100) {
            return Err(AppError::Validation(
                "Progress must be between 0 and 100".to_string(),
            ));
        }
        let _loading = self.loading.begin_exclusive("Task update")?;

        let cached = self.tasks().into_iter().find(|t| t.id == task_id);
        if let Some(task) = &cached {
            if task.assigned_to != identity.id && !identity.is_admin() {
                return Err(AppError::Forbidden("Only the assignee can update this task"));
            }
        } else if !identity.is_admin() {
            return Err(AppError::NotFound("Task"));
        }

        let change = StatusChange::new(status, progress);
        let mut patch = object(json!({
            "status": change.status,
            "updated_at": self.now(),
        }));
        if let Some(progress) = change.progress {
            patch.insert("progress".to_string(), json!(progress));
        }

        let written = self
            .data
            .update(Table::Tasks, &Query::new().eq("id", task_id), patch)
            .await?;

        let mut optimistic = cached.clone();
        if let Some(task) = optimistic.as_mut() {
            change.apply(task);
            self.replace_cached(task);
        }

        // The write answers with the stored row; only a disagreement costs a re-fetch.
        let confirmed = Task::try_from(written)?;
        if optimistic.as_ref() != Some(&confirmed) {
            debug!(task_id, "Optimistic task patch disagrees with server, reconciling");
            let scope = self.scope();
            match self.load(identity, scope).await {
                Ok(tasks) => self.store(scope, tasks),
                Err(e) => {
                    // the write went through; keep the server's row for this task
                    warn!(error = %e, task_id, "Task list refresh after update failed");
                    self.replace_cached(&confirmed);
                }
            }
        }

        info!(task_id, status = %confirmed.status, progress = confirmed.progress, "Task updated");
        self.notes.success(
            "Task Updated",
            format!("Task marked as {}", confirmed.status.label()),
        );
        Ok(confirmed)
    }

    pub async fn create(&self, identity: &Identity, new_task: NewTask) -> Option<Task> {
        match self.try_create(identity, new_task).await {
            Ok(task) => Some(task),
            Err(e) => {
                error!(error = %e, "Failed to create task");
                self.notes.failure(&e, "Failed to create task");
                None
            }
        }
    }

    async fn try_create(&self, identity: &Identity, new_task: NewTask) -> Result<Task, AppError> {
        if !identity.is_admin() {
            return Err(AppError::Forbidden("Only admins can create tasks"));
        }
        if new_task.title.trim().is_empty() || new_task.assigned_to.trim().is_empty() {
            return Err(AppError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        }
        let _loading = self.loading.begin_exclusive("Task creation")?;

        let now = self.now();
        let row = object(json!({
            "title": new_task.title.trim(),
            "description": new_task.description,
            "assigned_to": new_task.assigned_to,
            "assigned_by": identity.id,
            "priority": new_task.priority,
            "status": TaskStatus::Pending,
            "deadline": new_task.deadline,
            "progress": 0,
            "created_at": now,
            "updated_at": now,
        }));

        let task = Task::try_from(self.data.insert(Table::Tasks, row).await?)?;
        let scope = self.scope();
        if scope.includes(identity, &task) {
            let created = task.clone();
            self.with_tasks(|tasks| tasks.insert(0, created));
        }

        info!(task_id = %task.id, assigned_to = %task.assigned_to, "Task created");
        self.notes
            .success("Task Created", "New task has been created successfully");
        Ok(task)
    }

    pub async fn delete(&self, identity: &Identity, task_id: &str) -> bool {
        match self.try_delete(identity, task_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, task_id, "Failed to delete task");
                self.notes.failure(&e, "Failed to delete task");
                false
            }
        }
    }

    async fn try_delete(&self, identity: &Identity, task_id: &str) -> Result<(), AppError> {
        if !identity.is_admin() {
            return Err(AppError::Forbidden("Only admins can delete tasks"));
        }
        let _loading = self.loading.begin_exclusive("Task deletion")?;

        self.data
            .delete(Table::Tasks, &Query::new().eq("id", task_id))
            .await?;
        self.with_tasks(|tasks| tasks.retain(|t| t.id != task_id));

        info!(task_id, "Task deleted");
        self.notes
            .success("Task Deleted", "Task has been deleted successfully");
        Ok(())
    }
}
