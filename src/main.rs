use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use anyhow::Context;
use serde_json::json;

mod api;
mod auth;
mod billing;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use auth::policy::AdminPolicy;
use billing::anchor_cache;
use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({ "service": "messmates", "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("Database initialisation failed")?;

    let policy = Data::new(AdminPolicy::from_config(&config));
    let limiters = routes::Limiters::from_config(&config)?;
    let pool_for_anchor_warmup = pool.clone();
    let server_addr = config.server_addr.clone();

    if config.admin_emails.is_empty() {
        warn!("ADMIN_EMAILS is empty; only accounts with the admin role can administer");
    }

    actix_web::rt::spawn(async move {
        // Seed first-attendance anchors in batches of 250
        if let Err(e) = anchor_cache::warmup_anchor_cache(&pool_for_anchor_warmup, 250).await {
            warn!(error = %e, "Failed to warm up anchor cache");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(policy.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Cannot bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
