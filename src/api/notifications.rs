use actix_web::{HttpResponse, web};

use crate::auth::auth::Session;
use crate::error::AppError;

/// Take every pending notification of this session
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses((status = 200, description = "Pending notifications, oldest first", body = Vec<crate::sync::notify::Notification>)),
    tag = "Notifications"
)]
pub async fn drain(session: Session) -> HttpResponse {
    HttpResponse::Ok().json(session.notifications.drain())
}

/// Dismiss one notification
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Dismissed"),
        (status = 404, description = "No such notification pending")
    ),
    tag = "Notifications"
)]
pub async fn dismiss(session: Session, path: web::Path<u64>) -> Result<HttpResponse, AppError> {
    if session.notifications.dismiss(path.into_inner()) {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(AppError::NotFound("Notification"))
    }
}
