// src/handlers/ride_handler.rs
use axum::extract::{Json, Path, State};
use std::sync::Arc;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::ride::{CancelledRide, Ride},
    state::AppState,
};

pub async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
) -> TrackerResult<Json<Ride>> {
    let ride = state.repository.fetch_ride(&ride_id).await?;

    Ok(Json(ride))
}

pub async fn save_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
    Json(ride): Json<Ride>,
) -> TrackerResult<Json<Ride>> {
    if ride.id != ride_id {
        return Err(TrackerError::bad_request(format!(
            "ride id {} does not match path {}",
            ride.id, ride_id
        )));
    }
    let ride = state.repository.save_ride(&ride).await?;

    Ok(Json(ride))
}

pub async fn record_cancellation(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
    Json(record): Json<CancelledRide>,
) -> TrackerResult<Json<CancelledRide>> {
    if record.ride.id != ride_id {
        return Err(TrackerError::bad_request(format!(
            "cancellation for {} posted to {}",
            record.ride.id, ride_id
        )));
    }
    let record = state.repository.record_cancellation(&record).await?;

    Ok(Json(record))
}
