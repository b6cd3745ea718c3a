//! Post-signup seeding of sample tasks.
//!
//! Runs as its own task: waits until the new account is visible to the auth
//! service, then invokes the seeding procedure once. Callers hold a
//! [`SeedHandle`] and may await it or read its status; nobody has to.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use strum_macros::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::backend::{AuthService, Procedures};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeedStatus {
    Running,
    Seeded,
    /// The account never became visible (e.g. email confirmation pending).
    Skipped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SeedSettings {
    pub procedure: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl SeedSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            procedure: config.seed_procedure.clone(),
            poll_interval: Duration::from_millis(config.seed_poll_interval_ms),
            max_attempts: config.seed_max_attempts.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedHandle {
    rx: watch::Receiver<SeedStatus>,
}

impl SeedHandle {
    pub fn spawn(
        auth: Arc<dyn AuthService>,
        procedures: Arc<dyn Procedures>,
        settings: SeedSettings,
    ) -> Self {
        let (tx, rx) = watch::channel(SeedStatus::Running);
        tokio::spawn(async move {
            let outcome = run(auth.as_ref(), procedures.as_ref(), &settings).await;
            // receivers may all be gone; the outcome is logged either way
            let _ = tx.send(outcome);
        });
        Self { rx }
    }

    pub fn status(&self) -> SeedStatus {
        *self.rx.borrow()
    }

    /// Resolves once seeding has finished, whatever the outcome.
    pub async fn wait(&mut self) -> SeedStatus {
        match self.rx.wait_for(|s| *s != SeedStatus::Running).await {
            Ok(status) => *status,
            // sender dropped without a verdict: the task panicked or was aborted
            Err(_) => SeedStatus::Failed,
        }
    }
}

async fn run(
    auth: &dyn AuthService,
    procedures: &dyn Procedures,
    settings: &SeedSettings,
) -> SeedStatus {
    for attempt in 1..=settings.max_attempts {
        match auth.current_user().await {
            Ok(Some(user)) => {
                debug!(user_id = %user.id, attempt, "Account visible, seeding sample tasks");
                return match procedures
                    .call(&settings.procedure, json!({ "user_id": user.id }))
                    .await
                {
                    Ok(_) => {
                        info!(user_id = %user.id, procedure = %settings.procedure, "Sample tasks created");
                        SeedStatus::Seeded
                    }
                    Err(e) => {
                        warn!(error = %e, user_id = %user.id, "Error creating sample tasks");
                        SeedStatus::Failed
                    }
                };
            }
            Ok(None) => debug!(attempt, "Account not visible yet"),
            Err(e) => debug!(error = %e, attempt, "Could not read current user"),
        }
        tokio::time::sleep(settings.poll_interval).await;
    }

    warn!(attempts = settings.max_attempts, "Account never became visible, sample tasks skipped");
    SeedStatus::Skipped
}
