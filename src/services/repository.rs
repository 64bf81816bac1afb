// src/services/repository.rs
use async_trait::async_trait;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, NewRide, Ride, RideStatus},
    },
};

/// Persistence seam for the ride lifecycle. The session layer only talks to
/// this trait, so the backend can be swapped for the in-memory, HTTP or
/// redis implementation.
///
/// Ordering contract for `fetch_rides`: scheduled and in-progress rides by
/// start time ascending, completed rides by actual end time descending.
/// `fetch_cancellations` returns the most recent first.
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn fetch_profile(&self, driver_id: &str) -> TrackerResult<DriverProfile>;
    async fn save_profile(&self, profile: &DriverProfile) -> TrackerResult<DriverProfile>;
    async fn fetch_rides(&self, driver_id: &str, status: RideStatus) -> TrackerResult<Vec<Ride>>;
    async fn fetch_ride(&self, ride_id: &str) -> TrackerResult<Ride>;
    async fn create_ride(&self, driver_id: &str, ride: NewRide) -> TrackerResult<Ride>;
    async fn save_ride(&self, ride: &Ride) -> TrackerResult<Ride>;
    async fn record_cancellation(&self, record: &CancelledRide) -> TrackerResult<CancelledRide>;
    async fn fetch_cancellations(&self, driver_id: &str) -> TrackerResult<Vec<CancelledRide>>;
}

/// Sorts a status bucket into the order `fetch_rides` promises.
pub fn order_rides(rides: &mut [Ride], status: RideStatus) {
    match status {
        RideStatus::Completed => rides.sort_by(|a, b| b.actual_end_time.cmp(&a.actual_end_time)),
        _ => rides.sort_by(|a, b| a.start_time.cmp(&b.start_time)),
    }
}

/// Accepts a write over `existing` when the status is unchanged or follows a
/// lifecycle edge. Completed and cancelled rides take no further writes.
pub fn check_ride_write(existing: &Ride, incoming: &Ride) -> TrackerResult<()> {
    if existing.driver_id != incoming.driver_id {
        return Err(TrackerError::validation_error("driverId", "ride cannot change driver"));
    }
    let allowed = if existing.status.is_terminal() {
        false
    } else {
        existing.status == incoming.status || existing.status.can_transition_to(incoming.status)
    };
    if !allowed {
        return Err(TrackerError::InvalidTransition {
            ride_id: existing.id.clone(),
            from: existing.status,
            to: incoming.status,
        });
    }
    Ok(())
}

/// Plain ride saves never cancel; a cancellation only lands together with
/// its archive record through `record_cancellation`.
pub fn check_ride_save(existing: &Ride, incoming: &Ride) -> TrackerResult<()> {
    if incoming.status == RideStatus::Cancelled {
        return Err(TrackerError::validation_error(
            "status",
            format!("ride {} must be cancelled with a cancellation record", incoming.id),
        ));
    }
    check_ride_write(existing, incoming)
}
