//! In-process stand-in for the hosted service, used for local development
//! (`BACKEND_MODE=memory`) and by the tests.
//!
//! It mimics the behaviour the dashboard relies on: auto-confirmed sign-up that
//! signs the user in, the profile row created on sign-up, the unique
//! `(user_id, date)` constraint on attendance, and the sample-task procedure.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{
    AuthError, AuthEvent, AuthService, AuthSession, AuthState, AuthSubscription, AuthUser,
    Backend, BackendError, Connector, DataService, ObjectStorage, Procedures, Query, Row, Table,
    Upload, UserMetadata,
};

pub const SAMPLE_TASKS_PROCEDURE: &str = "create_sample_tasks_for_user";

/// Operation that should fail the next time it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Select(Table),
    Insert(Table),
    Update(Table),
    Delete(Table),
    Upload,
    Procedure,
}

struct Account {
    id: String,
    password: String,
    metadata: UserMetadata,
}

#[derive(Default)]
struct Store {
    accounts: HashMap<String, Account>,
    tables: HashMap<Table, Vec<Row>>,
    objects: HashMap<String, Upload>,
    failures: HashSet<FailPoint>,
    calls: Vec<String>,
}

impl Store {
    fn take_failure(&mut self, point: FailPoint) -> Result<(), BackendError> {
        if self.failures.remove(&point) {
            return Err(BackendError::Transport {
                service: "memory",
                message: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }

    fn rows(&mut self, table: Table) -> &mut Vec<Row> {
        self.tables.entry(table).or_default()
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Shared store; every `connect()` opens a client with its own auth session.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub fn fail_next(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    /// Inserts a row directly, bypassing any client session.
    #[cfg(test)]
    pub fn seed_row(&self, table: Table, row: Row) {
        self.lock().rows(table).push(row);
    }

    #[cfg(test)]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.lock().rows(table).clone()
    }

    #[cfg(test)]
    pub fn object(&self, path: &str) -> Option<Upload> {
        self.lock().objects.get(path).cloned()
    }

    /// Names of the procedures called so far, in order.
    #[cfg(test)]
    pub fn procedure_calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn sample_tasks(user_id: &str) -> Vec<Row> {
        let samples = [
            (
                "Database Schema Design",
                "Design the complete database schema for the new project",
                "high",
                "in_progress",
                40,
            ),
            (
                "API Documentation",
                "Create comprehensive API documentation",
                "medium",
                "pending",
                0,
            ),
            (
                "Frontend Components",
                "Build reusable UI components for the dashboard",
                "low",
                "pending",
                0,
            ),
        ];

        samples
            .into_iter()
            .map(|(title, description, priority, status, progress)| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "title": title,
                    "description": description,
                    "assigned_to": user_id,
                    "assigned_by": user_id,
                    "priority": priority,
                    "status": status,
                    "deadline": null,
                    "progress": progress,
                    "created_at": timestamp(),
                })
                .as_object()
                .cloned()
                .unwrap_or_default()
            })
            .collect()
    }
}

impl Connector for MemoryBackend {
    fn connect(&self) -> Backend {
        let client = Arc::new(MemoryClient {
            backend: self.clone(),
            auth: AuthState::default(),
        });
        Backend {
            auth: client.clone(),
            data: client.clone(),
            storage: client.clone(),
            procedures: client,
        }
    }
}

pub struct MemoryClient {
    backend: MemoryBackend,
    auth: AuthState,
}

impl MemoryClient {
    fn require_session(&self) -> Result<AuthSession, BackendError> {
        self.auth.current().ok_or(BackendError::NotAuthenticated)
    }
}

#[async_trait]
impl AuthService for MemoryClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = {
            let store = self.backend.lock();
            let account = store
                .accounts
                .get(&email.to_lowercase())
                .filter(|a| a.password == password)
                .ok_or(AuthError::InvalidCredentials)?;

            AuthSession {
                access_token: Uuid::new_v4().to_string(),
                user: AuthUser {
                    id: account.id.clone(),
                    email: email.to_lowercase(),
                    metadata: account.metadata.clone(),
                },
            }
        };

        self.auth.set(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<(), AuthError> {
        if password.len() < 6 {
            return Err(AuthError::Rejected(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let email = email.to_lowercase();
        let session = {
            let mut store = self.backend.lock();
            if store.accounts.contains_key(&email) {
                return Err(AuthError::AlreadyRegistered);
            }

            let id = Uuid::new_v4().to_string();
            store.accounts.insert(
                email.clone(),
                Account {
                    id: id.clone(),
                    password: password.to_string(),
                    metadata: metadata.clone(),
                },
            );

            // profile row the hosted service creates on account creation
            let profile = json!({
                "id": Uuid::new_v4().to_string(),
                "user_id": id,
                "full_name": metadata.display_name.clone().unwrap_or_default(),
                "department": metadata.department.clone().unwrap_or_default(),
                "position": metadata.position.clone().unwrap_or_default(),
                "role": metadata.role.clone().unwrap_or_else(|| "user".to_string()),
                "avatar_url": null,
                "created_at": timestamp(),
            });
            if let Value::Object(row) = profile {
                store.rows(Table::Profiles).push(row);
            }

            AuthSession {
                access_token: Uuid::new_v4().to_string(),
                user: AuthUser {
                    id,
                    email,
                    metadata: metadata.clone(),
                },
            }
        };

        self.auth.set(AuthEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.auth.set(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        Ok(self.auth.current().map(|s| s.user))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.auth.subscribe()
    }
}

#[async_trait]
impl DataService for MemoryClient {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, BackendError> {
        self.require_session()?;
        let mut store = self.backend.lock();
        store.take_failure(FailPoint::Select(table))?;

        // newest insert first, so equal sort keys come back newest first
        let mut rows: Vec<Row> = store
            .rows(table)
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(order.column), b.get(order.column));
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row, BackendError> {
        self.require_session()?;
        let mut store = self.backend.lock();
        store.take_failure(FailPoint::Insert(table))?;

        if table == Table::Attendance {
            let duplicate = store.rows(table).iter().any(|r| {
                r.get("user_id") == row.get("user_id") && r.get("date") == row.get("date")
            });
            if duplicate {
                return Err(BackendError::Status {
                    service: "memory",
                    status: 409,
                    message: "duplicate key value violates unique constraint \
                              \"attendance_user_id_date_key\""
                        .to_string(),
                });
            }
        }

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(timestamp()));
        store.rows(table).push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Row, BackendError> {
        self.require_session()?;
        let mut store = self.backend.lock();
        store.take_failure(FailPoint::Update(table))?;

        let mut first = None;
        for row in store.rows(table).iter_mut().filter(|r| query.matches(r)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            if first.is_none() {
                first = Some(row.clone());
            }
        }
        first.ok_or(BackendError::NoRows {
            table: table.name(),
        })
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<(), BackendError> {
        self.require_session()?;
        let mut store = self.backend.lock();
        store.take_failure(FailPoint::Delete(table))?;
        store.rows(table).retain(|r| !query.matches(r));
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &Upload,
        upsert: bool,
    ) -> Result<(), BackendError> {
        self.require_session()?;
        let mut store = self.backend.lock();
        store.take_failure(FailPoint::Upload)?;

        let key = format!("{bucket}/{path}");
        if !upsert && store.objects.contains_key(&key) {
            return Err(BackendError::Status {
                service: "storage",
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        store.objects.insert(key, file.clone());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/public/{bucket}/{path}")
    }
}

#[async_trait]
impl Procedures for MemoryClient {
    async fn call(&self, name: &str, args: Value) -> Result<Value, BackendError> {
        let mut store = self.backend.lock();
        store.calls.push(name.to_string());
        store.take_failure(FailPoint::Procedure)?;

        match name {
            SAMPLE_TASKS_PROCEDURE => {
                let user_id = args
                    .get("user_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| BackendError::Status {
                        service: "rpc",
                        status: 400,
                        message: "user_id is required".to_string(),
                    })?;
                let tasks = MemoryBackend::sample_tasks(user_id);
                store.rows(Table::Tasks).extend(tasks);
                Ok(Value::Null)
            }
            other => Err(BackendError::Status {
                service: "rpc",
                status: 404,
                message: format!("function {other} does not exist"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> UserMetadata {
        UserMetadata {
            display_name: Some(name.to_string()),
            role: Some("user".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sign_up_signs_in_and_creates_profile() {
        let backend = MemoryBackend::new();
        let client = backend.connect();

        client.auth.sign_up("Alice@x.com", "secret1", &meta("Alice")).await.unwrap();

        let user = client.auth.current_user().await.unwrap().unwrap();
        assert_eq!(user.email, "alice@x.com");
        let profiles = backend.rows(Table::Profiles);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["user_id"], Value::String(user.id));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let backend = MemoryBackend::new();
        let client = backend.connect();
        client.auth.sign_up("a@x.com", "secret1", &meta("A")).await.unwrap();

        let err = backend
            .connect()
            .auth
            .sign_up("a@x.com", "secret1", &meta("A"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn clients_keep_separate_sessions() {
        let backend = MemoryBackend::new();
        let first = backend.connect();
        first.auth.sign_up("a@x.com", "secret1", &meta("A")).await.unwrap();

        let second = backend.connect();
        assert!(second.auth.current_user().await.unwrap().is_none());
        let err = second.data.select(Table::Tasks, &Query::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::NotAuthenticated));
    }

    #[tokio::test]
    async fn attendance_is_unique_per_user_and_day() {
        let backend = MemoryBackend::new();
        let client = backend.connect();
        client.auth.sign_up("a@x.com", "secret1", &meta("A")).await.unwrap();

        let row = json!({"user_id": "u1", "date": "2026-03-02"})
            .as_object()
            .cloned()
            .unwrap();
        client.data.insert(Table::Attendance, row.clone()).await.unwrap();
        let err = client.data.insert(Table::Attendance, row).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let backend = MemoryBackend::new();
        let client = backend.connect();
        client.auth.sign_up("a@x.com", "secret1", &meta("A")).await.unwrap();

        backend.fail_next(FailPoint::Select(Table::Tasks));
        assert!(client.data.select(Table::Tasks, &Query::new()).await.is_err());
        assert!(client.data.select(Table::Tasks, &Query::new()).await.is_ok());
    }
}
