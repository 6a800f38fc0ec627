//! Web surface
//!
//! A single-page UI at `/` plus the JSON API under `/api` it drives.

pub mod responses;
pub mod routes;

use chrono::Utc;
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::serde::json::Json;
use rocket::{catch, catchers, routes, Build, Request, Rocket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::AppState;
use responses::ApiMessage;

#[catch(400)]
fn bad_request(_req: &Request) -> Json<ApiMessage> {
    Json(ApiMessage::error("Malformed request"))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ApiMessage> {
    Json(ApiMessage::error(format!("No route for {}", req.uri())))
}

#[catch(422)]
fn unprocessable(_req: &Request) -> Json<ApiMessage> {
    Json(ApiMessage::error("Request body could not be parsed"))
}

#[catch(500)]
fn internal_error(_req: &Request) -> Json<ApiMessage> {
    Json(ApiMessage::error("Internal server error"))
}

/// Rocket figment for the configured listener
pub fn figment(state: &AppState) -> Figment {
    rocket::Config::figment()
        .merge(("address", state.config.server.host.clone()))
        .merge(("port", state.config.server.port))
        .merge(("ident", format!("{}/{}", crate::NAME, crate::VERSION)))
}

/// Assemble the application on top of `figment`
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![routes::index, routes::health])
        .mount(
            "/api",
            routes![
                routes::create_session,
                routes::get_session,
                routes::delete_session,
                routes::load_url,
                routes::annotate,
                routes::update_settings,
                routes::update_selection,
                routes::start_download,
                routes::download_file,
                routes::download_archive,
            ],
        )
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .attach(session_purger())
}

/// Periodically drop sessions idle past their TTL
fn session_purger() -> AdHoc {
    AdHoc::on_liftoff("Session purge", |rocket| {
        Box::pin(async move {
            let Some(state) = rocket.state::<AppState>() else {
                return;
            };

            let sessions = Arc::clone(&state.sessions);
            let period = Duration::from_secs(state.config.session.purge_interval_seconds.max(1));
            info!("🧹 Purging idle sessions every {:?}", period);

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // First tick fires immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let purged = sessions.purge_expired(Utc::now()).await;
                    debug!("Session purge removed {} sessions", purged);
                }
            });
        })
    })
}
