use std::sync::{Arc, RwLock};

use tracing::{error, info, warn};

use crate::backend::{DataService, ObjectStorage, Query, Table, Upload, decode_rows, into_row};
use crate::error::AppError;
use crate::model::identity::Identity;
use crate::model::profile::{Profile, ProfileUpdate};
use crate::sync::Loading;
use crate::sync::notify::Notifications;

pub const AVATAR_BUCKET: &str = "avatars";

pub struct ProfileSync {
    data: Arc<dyn DataService>,
    storage: Arc<dyn ObjectStorage>,
    notes: Arc<Notifications>,
    loading: Loading,
    cache: RwLock<Option<Profile>>,
}

impl ProfileSync {
    pub fn new(
        data: Arc<dyn DataService>,
        storage: Arc<dyn ObjectStorage>,
        notes: Arc<Notifications>,
    ) -> Self {
        Self {
            data,
            storage,
            notes,
            loading: Loading::default(),
            cache: RwLock::new(None),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.cache.read().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.store(None);
    }

    fn store(&self, profile: Option<Profile>) {
        if let Ok(mut cache) = self.cache.write() {
            *cache = profile;
        }
    }

    /// Loads the identity's profile. A missing row is not an error; failures are only logged.
    pub async fn fetch(&self, identity: &Identity) -> Option<Profile> {
        let _loading = self.loading.begin();
        let query = Query::new().eq("user_id", identity.id.as_str()).limit(1);

        let result = match self.data.select(Table::Profiles, &query).await {
            Ok(rows) => rows.into_iter().next().map(Profile::try_from).transpose(),
            Err(e) => Err(e),
        };

        match result {
            Ok(profile) => {
                self.store(profile.clone());
                profile
            }
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Error fetching profile");
                self.profile()
            }
        }
    }

    /// Every profile, for the admin pages. Not cached.
    pub async fn fetch_all(&self, identity: &Identity) -> Vec<Profile> {
        if !identity.is_admin() {
            self.notes
                .failure(&AppError::Forbidden("Admin only"), "Failed to fetch users");
            return Vec::new();
        }
        let _loading = self.loading.begin();
        match self.data.select(Table::Profiles, &Query::new()).await {
            Ok(rows) => decode_rows(rows),
            Err(e) => {
                error!(error = %e, "Failed to fetch users");
                self.notes.failure(&AppError::from(e), "Failed to fetch users");
                Vec::new()
            }
        }
    }

    pub async fn update(&self, identity: &Identity, fields: ProfileUpdate) -> Option<Profile> {
        let result = match self.loading.begin_exclusive("Profile update") {
            Ok(_loading) => self.write(identity, fields).await,
            Err(e) => Err(e),
        };
        self.report(identity, result, "Failed to update profile")
    }

    fn report(
        &self,
        identity: &Identity,
        result: Result<Profile, AppError>,
        fallback: &str,
    ) -> Option<Profile> {
        match result {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "{fallback}");
                self.notes.failure(&e, fallback);
                None
            }
        }
    }

    async fn write(&self, identity: &Identity, fields: ProfileUpdate) -> Result<Profile, AppError> {
        if fields.is_empty() {
            return Err(AppError::Validation("No fields provided for update".to_string()));
        }

        let row = self
            .data
            .update(
                Table::Profiles,
                &Query::new().eq("user_id", identity.id.as_str()),
                into_row(&fields),
            )
            .await?;
        let profile = Profile::try_from(row)?;
        self.store(Some(profile.clone()));

        info!(user_id = %identity.id, "Profile updated");
        self.notes.success("Success", "Profile updated successfully");
        Ok(profile)
    }

    /// Stores the avatar at `avatars/{user id}.{ext}`, replacing any previous one,
    /// then points the profile at its public URL.
    pub async fn upload_avatar(&self, identity: &Identity, file: Upload) -> Option<String> {
        let result = match self.loading.begin_exclusive("Avatar upload") {
            Ok(_loading) => self.try_upload_avatar(identity, &file).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, user_id = %identity.id, file = %file.file_name, "Avatar upload failed");
                self.notes.failure(&e, "Failed to upload avatar");
                None
            }
        }
    }

    async fn try_upload_avatar(
        &self,
        identity: &Identity,
        file: &Upload,
    ) -> Result<String, AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::Validation("Please choose a file to upload".to_string()));
        }

        let path = format!("{AVATAR_BUCKET}/{}.{}", identity.id, file.extension());
        self.storage
            .upload(AVATAR_BUCKET, &path, file, true)
            .await
            .map_err(AppError::Storage)?;

        let url = self.storage.public_url(AVATAR_BUCKET, &path);
        let update = ProfileUpdate {
            avatar_url: Some(url.clone()),
            ..Default::default()
        };
        if let Err(e) = self.write(identity, update).await {
            warn!(error = %e, %path, "Avatar stored but profile not updated");
            return Err(e);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{FailPoint, MemoryBackend};
    use crate::testing::signed_in;

    async fn setup() -> (MemoryBackend, ProfileSync, Identity, Arc<Notifications>) {
        let backend = MemoryBackend::new();
        let (client, identity) = signed_in(&backend, "alice@x.com", "user").await;
        let notes = Arc::new(Notifications::default());
        let sync = ProfileSync::new(client.data.clone(), client.storage.clone(), notes.clone());
        (backend, sync, identity, notes)
    }

    fn png() -> Upload {
        Upload {
            file_name: "me.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn fetch_reads_profile_created_at_sign_up() {
        let (_, sync, identity, _) = setup().await;
        let profile = sync.fetch(&identity).await.unwrap();
        assert_eq!(profile.full_name, "alice");
        assert_eq!(profile.department, "Engineering");
    }

    #[tokio::test]
    async fn updated_name_is_read_back() {
        let (_, sync, identity, notes) = setup().await;
        let update = ProfileUpdate {
            full_name: Some("Alice Smith".into()),
            ..Default::default()
        };

        sync.update(&identity, update).await.unwrap();
        sync.clear();
        let profile = sync.fetch(&identity).await.unwrap();
        assert_eq!(profile.full_name, "Alice Smith");
        assert_eq!(profile.position, "Developer");
        assert_eq!(notes.drain()[0].description, "Profile updated successfully");
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let (_, sync, identity, notes) = setup().await;
        assert!(sync.update(&identity, ProfileUpdate::default()).await.is_none());
        assert_eq!(notes.drain()[0].description, "No fields provided for update");
    }

    #[tokio::test]
    async fn avatar_lands_under_user_id_and_updates_profile() {
        let (backend, sync, identity, _) = setup().await;

        let url = sync.upload_avatar(&identity, png()).await.unwrap();
        let path = format!("avatars/{}.png", identity.id);
        assert!(backend.object(&format!("avatars/{path}")).is_some());
        assert_eq!(url, format!("memory://storage/public/avatars/{path}"));
        assert_eq!(sync.profile().unwrap().avatar_url, Some(url));

        // replacing the avatar overwrites the same object
        assert!(sync.upload_avatar(&identity, png()).await.is_some());
    }

    #[tokio::test]
    async fn only_admins_list_profiles() {
        let (backend, sync, identity, notes) = setup().await;
        assert!(sync.fetch_all(&identity).await.is_empty());
        assert_eq!(notes.drain()[0].description, "Admin only");

        let (client, admin) = signed_in(&backend, "boss@x.com", "admin").await;
        let admin_sync = ProfileSync::new(client.data, client.storage, notes.clone());
        assert_eq!(admin_sync.fetch_all(&admin).await.len(), 2);
    }

    #[tokio::test]
    async fn failed_upload_skips_profile_update() {
        let (backend, sync, identity, notes) = setup().await;
        sync.fetch(&identity).await;
        backend.fail_next(FailPoint::Upload);

        assert!(sync.upload_avatar(&identity, png()).await.is_none());
        assert_eq!(sync.profile().unwrap().avatar_url, None);
        assert_eq!(notes.drain()[0].description, "Failed to upload avatar");
        assert!(!sync.is_loading());
    }
}
