//! Views (JSON view models rendered behind the role gate) and the actions
//! they trigger under `/api`.

pub mod admin;
pub mod attendance;
pub mod dashboard;
pub mod notifications;
pub mod pages;
pub mod profile;
pub mod tasks;

use actix_web::HttpResponse;
use serde::Serialize;

use crate::session::SessionContext;
use crate::sync::notify::Notification;

/// Result of an action. Failures were already turned into notifications by
/// the sync layer, so both shapes carry the drained queue.
#[derive(Serialize)]
pub struct Outcome<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub notifications: Vec<Notification>,
}

pub fn outcome<T: Serialize>(ctx: &SessionContext, data: Option<T>) -> HttpResponse {
    let ok = data.is_some();
    let body = Outcome {
        ok,
        data,
        notifications: ctx.notifications.drain(),
    };
    if ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::UnprocessableEntity().json(body)
    }
}
