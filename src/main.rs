use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod model;
mod models;
mod reward;
mod routes;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::engine::mysql_store::MySqlRecordStore;
use crate::engine::session::AttendanceService;
use crate::engine::store::SystemClock;
use crate::engine::sweeper::run_daily_sweep_loop;
use crate::reward::store::MySqlAchievements;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Lab attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
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

    info!(offset = %config.org_offset, "Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    let achievements = MySqlAchievements::new(pool.clone());
    let service = Arc::new(AttendanceService::new(
        Arc::new(MySqlRecordStore::new(pool.clone())),
        Arc::new(SystemClock {
            offset: config.org_offset,
        }),
        Arc::new(achievements.clone()),
        config.sweep_policy(),
    ));

    if config.sweep_enabled {
        actix_web::rt::spawn(run_daily_sweep_loop(service.clone(), config.reset_hour));
    } else {
        warn!("Daily sweep disabled; open sessions will not be reset");
    }

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(service.clone()))
            .app_data(Data::new(achievements.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
