use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::error::ErrorInternalServerError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    web::Data,
};
use tracing::debug;

use crate::auth::token::{issue_session_token, verify_session_token};
use crate::config::Config;
use crate::session::registry::SessionRegistry;

pub const SESSION_COOKIE: &str = "attend_session";

/// Echoes a freshly issued session token for clients that do not keep cookies.
pub const SESSION_HEADER: &str = "x-session-token";

fn bearer(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Binds every request to its session context, opening a new one (and setting
/// the cookie) when the token is missing, invalid or points at an expired context.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("App config missing"))?;
    let registry = req
        .app_data::<Data<SessionRegistry>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Session registry missing"))?;

    let token = req
        .cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer(&req));

    let existing = match token {
        Some(token) => match verify_session_token(&token, &config.session_secret) {
            Ok(claims) => registry.get(&claims.sid).await,
            Err(e) => {
                debug!(error = %e, "Discarding invalid session token");
                None
            }
        },
        None => None,
    };

    let (ctx, fresh) = match existing {
        Some(ctx) => (ctx, false),
        None => (registry.open().await, true),
    };
    req.extensions_mut().insert(ctx.clone());

    let mut res = next.call(req).await?;

    if fresh {
        let token = issue_session_token(&ctx.id, &config.session_secret, config.session_ttl)
            .map_err(|e| ErrorInternalServerError(e.to_string()))?;

        let cookie = Cookie::build(SESSION_COOKIE, token.clone())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(config.session_ttl as i64))
            .finish();
        res.response_mut().add_cookie(&cookie)?;

        if let Ok(value) = HeaderValue::from_str(&token) {
            res.headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
    }

    Ok(res)
}
