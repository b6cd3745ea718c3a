use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::backend::{AuthError, AuthService, Backend, Procedures, UserMetadata};
use crate::model::identity::Identity;
use crate::model::role::Role;
use crate::session::seed::{SeedHandle, SeedSettings};

/// How long an auth call waits for its state-change notification to land.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// True until the first auth notification arrives and while a sign-in or
    /// sign-up is in flight.
    pub loading: bool,
}

/// Profile fields collected by the sign-up form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignUpForm {
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Required when `role` is `admin`.
    #[serde(default)]
    pub admin_code: Option<String>,
}

pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    procedures: Arc<dyn Procedures>,
    seed: SeedSettings,
    admin_code: Option<String>,
    state: Arc<watch::Sender<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Subscribes to the backend's auth notifications. The subscription lives
    /// until [`SessionStore::shutdown`] or drop.
    pub fn start(backend: &Backend, seed: SeedSettings, admin_code: Option<&str>) -> Self {
        let (tx, _) = watch::channel(SessionState {
            identity: None,
            loading: true,
        });
        let state = Arc::new(tx);

        let mut subscription = backend.auth.subscribe();
        let listener_state = state.clone();
        let listener = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                let identity = change.session.as_ref().map(|s| Identity::from(&s.user));
                debug!(
                    event = %change.event,
                    user_id = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
                    "Auth state changed"
                );
                listener_state.send_modify(|s| {
                    s.identity = identity;
                    s.loading = false;
                });
            }
            debug!("Auth subscription closed");
        });

        Self {
            auth: backend.auth.clone(),
            procedures: backend.procedures.clone(),
            seed,
            admin_code: admin_code.map(str::to_string),
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.loading = loading);
    }

    /// Waits (bounded) until the state satisfies `pred` and returns it.
    pub async fn settle(&self, pred: impl FnMut(&SessionState) -> bool) -> SessionState {
        let mut rx = self.state.subscribe();
        match tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(pred)).await {
            Ok(Ok(state)) => state.clone(),
            _ => {
                warn!("Session state did not settle in time");
                self.snapshot()
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.set_loading(true);
        let session = match self.auth.sign_in(email.trim(), password).await {
            Ok(session) => session,
            Err(e) => {
                self.set_loading(false);
                return Err(e);
            }
        };

        let user_id = session.user.id.clone();
        let state = self
            .settle(|s| !s.loading && s.identity.as_ref().is_some_and(|i| i.id == user_id))
            .await;
        if state.loading {
            self.set_loading(false);
        }

        let identity = state
            .identity
            .unwrap_or_else(|| Identity::from(&session.user));
        info!(user_id = %identity.id, role = %identity.role, "Signed in");
        Ok(identity)
    }

    /// Creates the account and starts seeding its sample tasks in the background.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        form: SignUpForm,
    ) -> Result<SeedHandle, AuthError> {
        let full_name = form.full_name.trim();
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Rejected("Email and password are required".to_string()));
        }
        if full_name.is_empty() {
            return Err(AuthError::Rejected("Please enter your full name".to_string()));
        }
        if form.role == Role::Admin {
            match self.admin_code.as_deref() {
                None => {
                    return Err(AuthError::Rejected("Admin sign-up is disabled".to_string()));
                }
                Some(code) if form.admin_code.as_deref() != Some(code) => {
                    return Err(AuthError::Rejected("Invalid admin code".to_string()));
                }
                Some(_) => {}
            }
        }

        let metadata = UserMetadata {
            display_name: Some(full_name.to_string()),
            role: Some(form.role.to_string()),
            department: form.department.filter(|d| !d.trim().is_empty()),
            position: form.position.filter(|p| !p.trim().is_empty()),
        };

        self.set_loading(true);
        if let Err(e) = self.auth.sign_up(email.trim(), password, &metadata).await {
            self.set_loading(false);
            return Err(e);
        }

        // With email confirmation on there is no session yet.
        match self.auth.current_user().await {
            Ok(Some(user)) => {
                let user_id = user.id;
                self.settle(|s| s.identity.as_ref().is_some_and(|i| i.id == user_id))
                    .await;
            }
            Ok(None) => debug!("Sign-up finished without a session"),
            Err(e) => debug!(error = %e, "Could not read user after sign-up"),
        }
        self.set_loading(false);

        info!(email = %email.trim(), role = %form.role, "Account created");
        Ok(SeedHandle::spawn(
            self.auth.clone(),
            self.procedures.clone(),
            self.seed.clone(),
        ))
    }

    /// The local session is dropped even when the service cannot be reached.
    pub async fn sign_out(&self) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Sign-out request failed");
        }
        self.settle(|s| s.identity.is_none()).await;
        info!("Signed out");
    }

    /// Stops listening for auth notifications. Idempotent.
    pub fn shutdown(&self) {
        let handle = self.listener.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            handle.abort();
            debug!("Auth subscription released");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, SAMPLE_TASKS_PROCEDURE};
    use crate::backend::{Connector, Query, Table};
    use crate::session::seed::SeedStatus;

    fn seed_settings() -> SeedSettings {
        SeedSettings {
            procedure: SAMPLE_TASKS_PROCEDURE.to_string(),
            poll_interval: Duration::from_millis(5),
            max_attempts: 5,
        }
    }

    fn store(backend: &Backend) -> SessionStore {
        SessionStore::start(backend, seed_settings(), Some("s3cret-code"))
    }

    fn form(name: &str, role: Role) -> SignUpForm {
        SignUpForm {
            full_name: name.to_string(),
            role,
            department: Some("Engineering".into()),
            position: None,
            admin_code: None,
        }
    }

    #[tokio::test]
    async fn initial_notification_clears_loading() {
        let backend = MemoryBackend::new().connect();
        let store = store(&backend);

        let state = store.settle(|s| !s.loading).await;
        assert!(state.identity.is_none());
    }

    #[tokio::test]
    async fn sign_up_then_seeded_tasks_are_visible() {
        let memory = MemoryBackend::new();
        let backend = memory.connect();
        let store = store(&backend);

        let mut seed = store
            .sign_up("alice@x.com", "secret123", form("Alice", Role::User))
            .await
            .unwrap();
        let identity = store.identity().unwrap();
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.role, Role::User);

        assert_eq!(seed.wait().await, SeedStatus::Seeded);
        let tasks = backend
            .data
            .select(Table::Tasks, &Query::new().eq("assigned_to", identity.id.as_str()))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 3);
    }

    #[tokio::test]
    async fn admin_sign_up_needs_the_code() {
        let backend = MemoryBackend::new().connect();
        let store = store(&backend);

        let err = store
            .sign_up("boss@x.com", "secret123", form("Boss", Role::Admin))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid admin code");
        assert!(store.identity().is_none());

        let mut with_code = form("Boss", Role::Admin);
        with_code.admin_code = Some("s3cret-code".into());
        store.sign_up("boss@x.com", "secret123", with_code).await.unwrap();
        assert!(store.identity().unwrap().is_admin());
    }

    #[tokio::test]
    async fn admin_sign_up_is_off_without_a_configured_code() {
        let backend = MemoryBackend::new().connect();
        let store = SessionStore::start(&backend, seed_settings(), None);

        let mut guess = form("Boss", Role::Admin);
        guess.admin_code = Some("admin123secret".into());
        let err = store.sign_up("boss@x.com", "secret123", guess).await.unwrap_err();
        assert_eq!(err.to_string(), "Admin sign-up is disabled");
        assert!(store.identity().is_none());

        store
            .sign_up("alice@x.com", "secret123", form("Alice", Role::User))
            .await
            .unwrap();
        assert_eq!(store.identity().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn bad_credentials_reach_the_caller() {
        let memory = MemoryBackend::new();
        let backend = memory.connect();
        let store = store(&backend);
        store.sign_up("alice@x.com", "secret123", form("Alice", Role::User)).await.unwrap();
        store.sign_out().await;

        let err = store.sign_in("alice@x.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let state = store.snapshot();
        assert!(!state.loading);
        assert!(state.identity.is_none());

        let identity = store.sign_in("alice@x.com", "secret123").await.unwrap();
        assert_eq!(store.identity(), Some(identity));
    }

    #[tokio::test]
    async fn shutdown_stops_following_auth_changes() {
        let memory = MemoryBackend::new();
        let backend = memory.connect();
        let store = store(&backend);
        store.settle(|s| !s.loading).await;

        store.shutdown();
        backend
            .auth
            .sign_up("alice@x.com", "secret123", &UserMetadata::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.identity().is_none());
    }
}
