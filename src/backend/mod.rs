//! Boundary to the hosted backend: managed auth, managed tables, object storage
//! and server-side procedures.
//!
//! Everything above this module talks to the service through the traits below.
//! Rows cross the boundary as raw JSON objects and are turned into typed records
//! by the `TryFrom<Row>` impls in `crate::model`.

pub mod memory;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, IntoStaticStr};
use tokio::sync::broadcast;
use tracing::warn;

/// Raw row as returned by the data service.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Table {
    Attendance,
    Tasks,
    Profiles,
}

impl Table {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Errors raised by the data, storage and procedure boundaries.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {service} failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("no {table} row matched")]
    NoRows { table: &'static str },

    #[error("invalid {table} row: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },

    #[error("not signed in")]
    NotAuthenticated,
}

/// Errors the auth service reports back to a sign-in or sign-up form.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Account metadata attached at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

/// Live feed of auth state changes. Dropping it unsubscribes.
pub struct AuthSubscription {
    initial: Option<AuthChange>,
    rx: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    pub fn new(initial: AuthChange, rx: broadcast::Receiver<AuthChange>) -> Self {
        Self {
            initial: Some(initial),
            rx,
        }
    }

    /// Next change, starting with the session that was current at subscribe time.
    /// Returns `None` once the auth client is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Holds the client-side auth session and fans out state changes.
pub struct AuthState {
    session: std::sync::RwLock<Option<AuthSession>>,
    tx: broadcast::Sender<AuthChange>,
}

impl Default for AuthState {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            session: std::sync::RwLock::new(None),
            tx,
        }
    }
}

impl AuthState {
    pub fn current(&self) -> Option<AuthSession> {
        self.session.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    pub fn set(&self, event: AuthEvent, session: Option<AuthSession>) {
        if let Ok(mut slot) = self.session.write() {
            *slot = session.clone();
        }
        // No subscriber is fine: nobody is watching this client yet.
        let _ = self.tx.send(AuthChange { event, session });
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let rx = self.tx.subscribe();
        AuthSubscription::new(
            AuthChange {
                event: AuthEvent::InitialSession,
                session: self.current(),
            },
            rx,
        )
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// The account behind the current session, as the service sees it right now.
    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError>;

    fn subscribe(&self) -> AuthSubscription;
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column,
            value: value.into(),
        });
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|f| row.get(f.column).is_some_and(|v| *v == f.value))
    }
}

#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, BackendError>;

    async fn insert(&self, table: Table, row: Row) -> Result<Row, BackendError>;

    /// Applies `patch` to the rows matching `query` and returns the first updated row.
    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Row, BackendError>;

    async fn delete(&self, table: Table, query: &Query) -> Result<(), BackendError>;
}

/// A file handed over by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Extension of the original file name as used in the storage key.
    /// Anything but a short ASCII alphanumeric extension becomes `bin`.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext))
                if !ext.is_empty()
                    && ext.len() <= 10
                    && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
            {
                ext
            }
            _ => "bin",
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &Upload,
        upsert: bool,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
pub trait Procedures: Send + Sync {
    async fn call(&self, name: &str, args: Value) -> Result<Value, BackendError>;
}

/// One client's view of the hosted service. All four handles share the same
/// auth session, so data calls run with the signed-in user's token.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthService>,
    pub data: Arc<dyn DataService>,
    pub storage: Arc<dyn ObjectStorage>,
    pub procedures: Arc<dyn Procedures>,
}

/// Opens a fresh client (with its own auth session) per browser session.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Backend;
}

pub fn decode_row<T: DeserializeOwned>(table: &'static str, row: Row) -> Result<T, BackendError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| BackendError::Decode {
        table,
        message: e.to_string(),
    })
}

/// Converts every row, dropping (and logging) the ones that fail validation.
pub fn decode_rows<T>(rows: Vec<Row>) -> Vec<T>
where
    T: TryFrom<Row, Error = BackendError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping invalid row");
                None
            }
        })
        .collect()
}

pub fn into_row<T: Serialize>(value: &T) -> Row {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_matches_all_filters() {
        let row = json!({"user_id": "u1", "date": "2026-03-02"})
            .as_object()
            .cloned()
            .unwrap();

        assert!(Query::new().eq("user_id", "u1").matches(&row));
        assert!(Query::new().eq("user_id", "u1").eq("date", "2026-03-02").matches(&row));
        assert!(!Query::new().eq("user_id", "u2").matches(&row));
        assert!(!Query::new().eq("missing", "x").matches(&row));
    }

    #[test]
    fn upload_extension_defaults_to_bin() {
        let file = |name: &str| Upload {
            file_name: name.into(),
            content_type: "image/png".into(),
            bytes: vec![],
        };
        assert_eq!(file("me.png").extension(), "png");
        assert_eq!(file("archive.tar.gz").extension(), "gz");
        assert_eq!(file("avatar").extension(), "bin");
        assert_eq!(file("x./evil").extension(), "bin");
        assert_eq!(file("me.png?x=1#y").extension(), "bin");
        assert_eq!(file("trailing.").extension(), "bin");
    }

    #[tokio::test]
    async fn subscription_starts_with_current_session() {
        let state = AuthState::default();
        let mut sub = state.subscribe();

        let first = sub.recv().await.unwrap();
        assert_eq!(first.event, AuthEvent::InitialSession);
        assert!(first.session.is_none());

        state.set(AuthEvent::SignedOut, None);
        assert_eq!(sub.recv().await.unwrap().event, AuthEvent::SignedOut);
    }
}
