use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod backend;
mod config;
mod docs;
mod error;
mod gate;
mod model;
mod models;
mod routes;
mod session;
mod shell;
mod sync;
mod utils;

#[cfg(test)]
mod testing;

use backend::Connector;
use backend::memory::MemoryBackend;
use backend::remote::RemoteConnector;
use config::{BackendMode, Config};
use session::registry::SessionRegistry;
use utils::clock::SystemClock;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn connector(config: &Config) -> anyhow::Result<Arc<dyn Connector>> {
    Ok(match config.backend_mode {
        BackendMode::Remote => Arc::new(
            RemoteConnector::new(
                &config.backend_url,
                &config.backend_anon_key,
                Duration::from_secs(config.http_timeout_secs),
            )
            .context("Failed to build the backend client")?,
        ),
        BackendMode::Memory => {
            warn!("Using the in-memory backend; data is lost on restart");
            Arc::new(MemoryBackend::new())
        }
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    info!(addr = %config.server_addr, mode = ?config.backend_mode, "Server starting...");
    if config.admin_signup_code.is_none() {
        warn!("ADMIN_SIGNUP_CODE is not set; admin sign-up is disabled");
    }

    let registry = SessionRegistry::new(connector(&config)?, Arc::new(SystemClock), config.clone());
    let protected_limiter = Arc::new(routes::build_limiter(config.rate_protected_per_min));
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(protected_limiter.clone())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(registry.clone()))
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
