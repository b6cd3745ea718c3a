use std::ops::Deref;
use std::sync::Arc;

use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorInternalServerError,
};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::identity::Identity;
use crate::session::SessionContext;

fn context(req: &HttpRequest) -> Result<Arc<SessionContext>, actix_web::Error> {
    req.extensions()
        .get::<Arc<SessionContext>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Session context missing"))
}

/// The caller's session context, signed in or not.
pub struct Session(pub Arc<SessionContext>);

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(context(req).map(Session))
    }
}

impl Deref for Session {
    type Target = SessionContext;

    fn deref(&self) -> &SessionContext {
        &self.0
    }
}

/// A session with a signed-in identity; anything else is rejected with 401.
pub struct Authed {
    pub ctx: Arc<SessionContext>,
    pub identity: Identity,
}

impl FromRequest for Authed {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let ctx = match context(req) {
            Ok(ctx) => ctx,
            Err(e) => return ready(Err(e)),
        };

        match ctx.identity() {
            Some(identity) => ready(Ok(Authed { ctx, identity })),
            None => ready(Err(AppError::Unauthenticated.into())),
        }
    }
}

impl Deref for Authed {
    type Target = SessionContext;

    fn deref(&self) -> &SessionContext {
        &self.ctx
    }
}

impl Authed {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.identity.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only"))
        }
    }
}
