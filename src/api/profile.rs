use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::outcome;
use crate::auth::auth::Authed;
use crate::backend::Upload;
use crate::model::identity::Identity;
use crate::model::profile::{Profile, ProfileUpdate};
use crate::model::role::Role;
use crate::session::SessionContext;

/// Largest avatar accepted by `POST /api/profile/avatar`.
pub const AVATAR_LIMIT: usize = 5 * 1024 * 1024;

/// Original name of the uploaded file; its extension names the stored object.
pub const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Serialize, ToSchema)]
pub struct ProfileView {
    pub email: String,
    pub role: Role,
    /// `None` until the profile row exists.
    pub profile: Option<Profile>,
    pub loading: bool,
}

pub async fn profile_view(ctx: &SessionContext, identity: &Identity) -> ProfileView {
    let profile = ctx.profile.fetch(identity).await;
    ProfileView {
        email: identity.email.clone(),
        role: identity.role,
        profile,
        loading: ctx.profile.is_loading(),
    }
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = Object, example = json!({
            "ok": true,
            "data": { "user_id": "…", "full_name": "Alice Doe", "department": "Engineering", "position": "Developer", "avatar_url": null },
            "notifications": [{ "id": 1, "title": "Success", "description": "Profile updated successfully", "variant": "default" }]
        })),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Update rejected; see notifications")
    ),
    tag = "Profile"
)]
pub async fn update_profile(auth: Authed, body: web::Json<ProfileUpdate>) -> HttpResponse {
    let profile = auth.profile.update(&auth.identity, body.into_inner()).await;
    outcome(&auth, profile)
}

/// Upload a new avatar; the body is the raw image
#[utoipa::path(
    post,
    path = "/api/profile/avatar",
    params(
        ("x-file-name" = String, Header, description = "Original file name, e.g. `me.png`")
    ),
    request_body(content = Vec<u8>, content_type = "image/*"),
    responses(
        (status = 200, description = "Avatar stored", body = Object, example = json!({
            "ok": true,
            "data": { "avatar_url": "https://…/storage/v1/object/public/avatars/avatars/u1.png" },
            "notifications": [{ "id": 1, "title": "Success", "description": "Profile updated successfully", "variant": "default" }]
        })),
        (status = 401, description = "Not signed in"),
        (status = 413, description = "File too large"),
        (status = 422, description = "Upload failed; see notifications")
    ),
    tag = "Profile"
)]
pub async fn upload_avatar(auth: Authed, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let file = Upload {
        file_name: header(FILE_NAME_HEADER).unwrap_or_else(|| "avatar".to_string()),
        content_type: header(CONTENT_TYPE.as_str())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        bytes: body.to_vec(),
    };

    let url = auth.profile.upload_avatar(&auth.identity, file).await;
    outcome(&auth, url.map(|url| json!({ "avatar_url": url })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::testing::{sign_up, test_app};

    #[actix_web::test]
    async fn avatar_upload_updates_profile() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;
        let bearer = sign_up(&app, "alice@x.com", "user").await;

        let req = test::TestRequest::post()
            .uri("/api/profile/avatar")
            .insert_header(("Authorization", bearer.clone()))
            .insert_header((FILE_NAME_HEADER, "me.png"))
            .insert_header((CONTENT_TYPE, "image/png"))
            .set_payload(vec![0x89, 0x50, 0x4e, 0x47])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let url = body["data"]["avatar_url"].as_str().unwrap().to_string();
        assert!(url.ends_with(".png"));

        let req = test::TestRequest::put()
            .uri("/api/profile")
            .insert_header(("Authorization", bearer))
            .set_json(json!({ "full_name": "Alice Doe" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["full_name"], "Alice Doe");
        assert_eq!(body["data"]["avatar_url"], url.as_str());
    }

    #[actix_web::test]
    async fn empty_update_is_rejected_with_a_notification() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;
        let bearer = sign_up(&app, "alice@x.com", "user").await;

        let req = test::TestRequest::put()
            .uri("/api/profile")
            .insert_header(("Authorization", bearer))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["notifications"][0]["description"], "No fields provided for update");
    }
}
