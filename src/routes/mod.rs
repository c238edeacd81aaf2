// Route handlers, one module per resource.
//
// Full pages come back as askama templates; the htmx endpoints return
// fragments that get swapped into the page.
pub mod admin;
pub mod auth;
pub mod health;
pub mod index;
pub mod leagues;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Root and health
        .route("/", get(index::home))
        .route("/robots.txt", get(index::robots))
        .route("/health", get(health::health_check))

        // Account endpoints
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/logout", get(auth::logout))
        .route("/account/delete", get(auth::delete_form).post(auth::delete_account))

        // League endpoints
        .route("/leagues", get(leagues::list_leagues))
        .route("/leagues/{id}", get(leagues::get_league))
        .route("/leagues/join/{id}", get(leagues::join_league))
        .route("/leagues/meetinfo", post(leagues::meet_info))
        .route("/leagues/athleteinfo", post(leagues::athlete_info))
        .route("/leagues/{id}/meetpicks", post(leagues::submit_picks))

        // Admin endpoints
        .route("/admin/seasons", post(admin::create_season))
        .route("/admin/seasons/{id}/current_meet", post(admin::set_current_meet))
        .route("/admin/leagues", post(admin::create_league))
        .route("/admin/meets", post(admin::create_meet))
        .route("/admin/athletes", post(admin::create_athlete))
        .route("/admin/races", post(admin::record_race))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
