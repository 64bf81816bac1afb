// src/handlers/mod.rs
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub mod driver_handler;
pub mod ride_handler;

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/drivers/:driver_id/profile",
            get(driver_handler::get_profile).put(driver_handler::save_profile),
        )
        .route(
            "/drivers/:driver_id/rides",
            get(driver_handler::list_rides).post(driver_handler::create_ride),
        )
        .route("/drivers/:driver_id/cancellations", get(driver_handler::list_cancellations))
        .route(
            "/rides/:ride_id",
            get(ride_handler::get_ride).put(ride_handler::save_ride),
        )
        .route("/rides/:ride_id/cancellation", post(ride_handler::record_cancellation))
        .layer(cors)
        .with_state(state)
}
