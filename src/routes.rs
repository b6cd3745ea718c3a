use crate::{
    api::{attendance, notifications, pages, profile, tasks},
    auth::{handlers, middleware::session_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-IP limiter allowing `requests_per_min` with a burst of the same size.
pub fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let signup_limiter = Arc::new(build_limiter(config.rate_signup_per_min));

    // Actions
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(session_middleware))
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter)
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/signup")
                            .wrap(signup_limiter)
                            .route(web::post().to(handlers::signup)),
                    )
                    .service(web::resource("/logout").route(web::post().to(handlers::logout))),
            )
            .service(
                web::scope("/session")
                    // /session
                    .service(web::resource("").route(web::get().to(handlers::current)))
                    // /session/seed
                    .service(web::resource("/seed").route(web::get().to(handlers::seed_status))),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/history/export")
                            .route(web::get().to(attendance::export_history)),
                    ),
            )
            .service(
                web::resource("/tasks/{id}/status").route(web::patch().to(tasks::update_status)),
            )
            .service(
                web::scope("/profile")
                    // /profile
                    .service(web::resource("").route(web::put().to(profile::update_profile)))
                    // /profile/avatar
                    .service(
                        web::resource("/avatar")
                            .app_data(web::PayloadConfig::new(profile::AVATAR_LIMIT))
                            .route(web::post().to(profile::upload_avatar)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(web::resource("").route(web::get().to(notifications::drain)))
                    .service(
                        web::resource("/{id}").route(web::delete().to(notifications::dismiss)),
                    ),
            )
            .service(
                web::scope("/admin/tasks")
                    // /admin/tasks
                    .service(web::resource("").route(web::post().to(tasks::create_task)))
                    // /admin/tasks/{id}
                    .service(web::resource("/{id}").route(web::delete().to(tasks::delete_task))),
            ),
    );

    // Pages: everything else goes through the route table and the role gate
    cfg.service(
        web::scope("")
            .wrap(from_fn(session_middleware))
            .default_service(web::to(pages::render)),
    );
}
