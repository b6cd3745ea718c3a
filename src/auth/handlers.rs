use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use utoipa::IntoParams;

use crate::auth::auth::Session;
use crate::error::AppError;
use crate::models::{AuthResponse, LoginRequest, SignUpRequest};
use crate::session::registry::SessionRegistry;

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid login credentials", body = Object, example = json!({
            "error": "Invalid login credentials"
        })),
        (status = 502, description = "Auth service unreachable")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(session, body), fields(email = %body.email))]
pub async fn login(
    session: Session,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let previous = session.identity().map(|i| i.id);
    let identity = session.session.sign_in(&body.email, &body.password).await?;
    if previous.as_deref() != Some(identity.id.as_str()) {
        debug!("Identity changed, dropping cached data");
        session.clear_caches();
    }

    Ok(HttpResponse::Ok().json(AuthResponse {
        redirect: identity.role.home_path().to_string(),
        identity: Some(identity),
        seed: None,
    }))
}

/// Create an account; sample tasks are seeded in the background
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Sign-up form rejected", body = Object, example = json!({
            "error": "Please enter your full name"
        })),
        (status = 409, description = "User already registered")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_signup",
    skip(session, body),
    fields(email = %body.email, role = %body.profile.role)
)]
pub async fn signup(
    session: Session,
    body: web::Json<SignUpRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Sign-up request received");

    let SignUpRequest {
        email,
        password,
        profile,
    } = body.into_inner();

    session.clear_caches();
    let seed = session.session.sign_up(&email, &password, profile).await?;
    let status = seed.status();
    session.track_seed(seed);

    let identity = session.identity();
    let redirect = identity
        .as_ref()
        .map(|i| i.role.home_path())
        .unwrap_or("/login");

    Ok(HttpResponse::Created().json(AuthResponse {
        identity,
        redirect: redirect.to_string(),
        seed: Some(status),
    }))
}

/// Sign out of the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = Object, example = json!({
            "redirect": "/login"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_logout", skip(session, registry), fields(session_id = %session.id))]
pub async fn logout(session: Session, registry: web::Data<SessionRegistry>) -> HttpResponse {
    session.session.sign_out().await;
    // the next request opens a fresh context
    registry.remove(&session.id).await;
    HttpResponse::Ok().json(json!({ "redirect": "/login" }))
}

/// Current identity and loading flag
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Session state", body = crate::session::store::SessionState)),
    tag = "Auth"
)]
pub async fn current(session: Session) -> HttpResponse {
    HttpResponse::Ok().json(session.session.snapshot())
}

#[derive(Deserialize, IntoParams)]
pub struct SeedQuery {
    /// Block until seeding has finished.
    #[serde(default)]
    pub wait: bool,
}

/// Status of the sample-task seeding started by the last sign-up
#[utoipa::path(
    get,
    path = "/api/session/seed",
    params(SeedQuery),
    responses(
        (status = 200, description = "Seeding status", body = Object, example = json!({
            "status": "seeded"
        })),
        (status = 404, description = "This session did not sign up")
    ),
    tag = "Auth"
)]
pub async fn seed_status(
    session: Session,
    query: web::Query<SeedQuery>,
) -> Result<HttpResponse, AppError> {
    let mut handle = session
        .seed_handle()
        .ok_or(AppError::NotFound("Seeding task"))?;

    let status = if query.wait {
        handle.wait().await
    } else {
        handle.status()
    };
    Ok(HttpResponse::Ok().json(json!({ "status": status })))
}
