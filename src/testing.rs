//! Shared fixtures for the unit tests.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use chrono::{FixedOffset, NaiveTime};
use serde_json::json;

use crate::auth::middleware::SESSION_HEADER;
use crate::backend::memory::MemoryBackend;
use crate::backend::{Backend, Connector, UserMetadata};
use crate::config::Config;
use crate::model::identity::Identity;
use crate::routes;
use crate::session::registry::SessionRegistry;
use crate::utils::clock::{SystemClock, Workday};

/// Peer address for requests that pass through the per-IP limiters.
pub const PEER: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));

/// UTC office day with a 09:00 cutoff.
pub fn workday() -> Workday {
    Workday {
        offset: FixedOffset::east_opt(0).unwrap(),
        late_after: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        location: "Office".to_string(),
    }
}

/// Registers an account on `backend` and returns a client signed in as it.
pub async fn signed_in(backend: &MemoryBackend, email: &str, role: &str) -> (Backend, Identity) {
    let client = backend.connect();
    let name = email.split('@').next().unwrap().to_string();
    client
        .auth
        .sign_up(
            email,
            "secret123",
            &UserMetadata {
                display_name: Some(name),
                role: Some(role.to_string()),
                department: Some("Engineering".to_string()),
                position: Some("Developer".to_string()),
            },
        )
        .await
        .unwrap();

    let user = client.auth.current_user().await.unwrap().unwrap();
    let identity = Identity::from(&user);
    (client, identity)
}

/// Routes and app data of the server, wired to `backend`.
pub fn test_app(backend: &MemoryBackend) -> impl FnOnce(&mut web::ServiceConfig) {
    let config = Config::for_tests();
    let registry = SessionRegistry::new(
        Arc::new(backend.clone()),
        Arc::new(SystemClock),
        config.clone(),
    );
    move |cfg| {
        cfg.app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(registry));
        routes::configure(cfg, config);
    }
}

/// Signs up through the API and returns the `Authorization` value of the new session.
pub async fn sign_up<S, B>(app: &S, email: &str, role: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .peer_addr(PEER)
        .set_json(json!({
            "email": email,
            "password": "secret123",
            "full_name": email.split('@').next().unwrap(),
            "role": role,
            "department": "Engineering",
            "position": "Developer",
            "admin_code": Config::for_tests().admin_signup_code,
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(resp.status().is_success(), "sign-up failed: {}", resp.status());
    let token = resp.headers().get(SESSION_HEADER).unwrap().to_str().unwrap();
    format!("Bearer {token}")
}
