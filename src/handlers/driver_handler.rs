// src/handlers/driver_handler.rs
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, NewRide, Ride, RideStatus},
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RideQuery {
    status: Option<String>,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> TrackerResult<Json<DriverProfile>> {
    let profile = state.repository.fetch_profile(&driver_id).await?;

    Ok(Json(profile))
}

pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(profile): Json<DriverProfile>,
) -> TrackerResult<Json<DriverProfile>> {
    if profile.id != driver_id {
        return Err(TrackerError::bad_request(format!(
            "profile id {} does not match path {}",
            profile.id, driver_id
        )));
    }
    let profile = state.repository.save_profile(&profile).await?;

    Ok(Json(profile))
}

/// Without a status filter every bucket is returned, scheduled first.
pub async fn list_rides(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Query(query): Query<RideQuery>,
) -> TrackerResult<Json<Vec<Ride>>> {
    let statuses = match query.status.as_deref() {
        Some(value) => vec![RideStatus::parse(value)
            .ok_or_else(|| TrackerError::bad_request(format!("unknown ride status: {}", value)))?],
        None => RideStatus::ALL.to_vec(),
    };

    let mut rides = Vec::new();
    for status in statuses {
        rides.extend(state.repository.fetch_rides(&driver_id, status).await?);
    }

    Ok(Json(rides))
}

pub async fn create_ride(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(request): Json<NewRide>,
) -> TrackerResult<(StatusCode, Json<Ride>)> {
    let ride = state.repository.create_ride(&driver_id, request).await?;

    Ok((StatusCode::CREATED, Json(ride)))
}

pub async fn list_cancellations(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> TrackerResult<Json<Vec<CancelledRide>>> {
    let records = state.repository.fetch_cancellations(&driver_id).await?;

    Ok(Json(records))
}
