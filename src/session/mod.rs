//! One explicit context per browser session: the session store, the entity
//! sync components and the notification queue. Nothing here is global; the
//! registry hands contexts to handlers through request extensions.

pub mod registry;
pub mod seed;
pub mod store;

use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::config::Config;
use crate::model::identity::Identity;
use crate::session::seed::{SeedHandle, SeedSettings};
use crate::session::store::SessionStore;
use crate::sync::attendance::AttendanceSync;
use crate::sync::notify::Notifications;
use crate::sync::profile::ProfileSync;
use crate::sync::tasks::TaskSync;
use crate::utils::clock::{Clock, Workday};

pub struct SessionContext {
    pub id: String,
    pub session: SessionStore,
    pub attendance: AttendanceSync,
    pub tasks: TaskSync,
    pub profile: ProfileSync,
    pub notifications: Arc<Notifications>,
    seed: Mutex<Option<SeedHandle>>,
}

impl SessionContext {
    pub fn open(id: String, backend: Backend, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let notifications = Arc::new(Notifications::default());
        Self {
            session: SessionStore::start(
                &backend,
                SeedSettings::from_config(config),
                config.admin_signup_code.as_deref(),
            ),
            attendance: AttendanceSync::new(
                backend.data.clone(),
                clock.clone(),
                Workday::from_config(config),
                notifications.clone(),
            ),
            tasks: TaskSync::new(backend.data.clone(), clock, notifications.clone()),
            profile: ProfileSync::new(backend.data, backend.storage, notifications.clone()),
            notifications,
            seed: Mutex::new(None),
            id,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub fn track_seed(&self, handle: SeedHandle) {
        if let Ok(mut slot) = self.seed.lock() {
            *slot = Some(handle);
        }
    }

    pub fn seed_handle(&self) -> Option<SeedHandle> {
        self.seed.lock().ok().and_then(|slot| slot.clone())
    }

    /// Drops everything cached for the previous identity.
    pub fn clear_caches(&self) {
        self.attendance.clear();
        self.tasks.clear();
        self.profile.clear();
    }

    pub fn shutdown(&self) {
        self.session.shutdown();
        self.clear_caches();
    }
}
