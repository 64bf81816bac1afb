// src/services/memory_repository.rs
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, NewRide, Ride, RideStatus},
    },
    services::repository::{check_ride_save, check_ride_write, order_rides, RideRepository},
    utils::{id_generator::generate_ride_id, mock_data},
};

/// Process-local repository. Backs the mock backend and the tests.
///
/// Writes apply the same lifecycle rules as the session store, so a client
/// cannot push a ride backwards through the backend either.
#[derive(Debug, Default)]
pub struct MemoryRideRepository {
    profiles: RwLock<HashMap<String, DriverProfile>>,
    rides: RwLock<HashMap<String, Ride>>,
    cancellations: RwLock<Vec<CancelledRide>>,
}

impl MemoryRideRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver "1" with two scheduled and two completed rides.
    pub fn seeded() -> Self {
        let mut rides = mock_data::upcoming_rides();
        rides.extend(mock_data::completed_rides());
        Self::with_data(vec![mock_data::driver_profile()], rides)
    }

    pub fn with_data(profiles: Vec<DriverProfile>, rides: Vec<Ride>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.id.clone(), p)).collect()),
            rides: RwLock::new(rides.into_iter().map(|r| (r.id.clone(), r)).collect()),
            cancellations: RwLock::new(Vec::new()),
        }
    }

    async fn ensure_driver(&self, driver_id: &str) -> TrackerResult<()> {
        if self.profiles.read().await.contains_key(driver_id) {
            Ok(())
        } else {
            Err(TrackerError::driver_not_found(driver_id))
        }
    }
}

#[async_trait]
impl RideRepository for MemoryRideRepository {
    #[tracing::instrument(skip(self))]
    async fn fetch_profile(&self, driver_id: &str) -> TrackerResult<DriverProfile> {
        self.profiles
            .read()
            .await
            .get(driver_id)
            .cloned()
            .ok_or_else(|| TrackerError::driver_not_found(driver_id))
    }

    #[tracing::instrument(skip(self, profile), fields(driver_id = %profile.id))]
    async fn save_profile(&self, profile: &DriverProfile) -> TrackerResult<DriverProfile> {
        if !profile.counters_consistent() {
            return Err(TrackerError::validation_error(
                "totalRides",
                "completed and cancelled rides exceed total rides",
            ));
        }

        let mut profiles = self.profiles.write().await;
        let slot = profiles
            .get_mut(&profile.id)
            .ok_or_else(|| TrackerError::driver_not_found(&profile.id))?;
        *slot = profile.clone();

        tracing::debug!("Profile saved");
        Ok(profile.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_rides(&self, driver_id: &str, status: RideStatus) -> TrackerResult<Vec<Ride>> {
        self.ensure_driver(driver_id).await?;

        let mut rides: Vec<Ride> = self
            .rides
            .read()
            .await
            .values()
            .filter(|ride| ride.driver_id == driver_id && ride.status == status)
            .cloned()
            .collect();
        order_rides(&mut rides, status);

        tracing::debug!("Found {} rides", rides.len());
        Ok(rides)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
        self.rides
            .read()
            .await
            .get(ride_id)
            .cloned()
            .ok_or_else(|| TrackerError::ride_not_found(ride_id))
    }

    #[tracing::instrument(skip(self, ride))]
    async fn create_ride(&self, driver_id: &str, ride: NewRide) -> TrackerResult<Ride> {
        self.ensure_driver(driver_id).await?;

        let ride = ride.into_ride(generate_ride_id(), driver_id.to_string());
        ride.validate()?;

        let mut rides = self.rides.write().await;
        if rides.contains_key(&ride.id) {
            return Err(TrackerError::DuplicateRide(ride.id));
        }
        rides.insert(ride.id.clone(), ride.clone());

        tracing::info!("Ride created: {}", ride.id);
        Ok(ride)
    }

    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id, status = %ride.status))]
    async fn save_ride(&self, ride: &Ride) -> TrackerResult<Ride> {
        ride.validate()?;

        let mut rides = self.rides.write().await;
        let existing = rides
            .get_mut(&ride.id)
            .ok_or_else(|| TrackerError::ride_not_found(&ride.id))?;
        check_ride_save(existing, ride)?;
        *existing = ride.clone();

        tracing::debug!("Ride saved");
        Ok(ride.clone())
    }

    #[tracing::instrument(skip(self, record), fields(ride_id = %record.ride.id))]
    async fn record_cancellation(&self, record: &CancelledRide) -> TrackerResult<CancelledRide> {
        if record.ride.status != RideStatus::Cancelled {
            return Err(TrackerError::validation_error(
                "status",
                format!("cancellation record carries a {} ride", record.ride.status),
            ));
        }
        record.ride.validate()?;

        let mut rides = self.rides.write().await;
        let mut cancellations = self.cancellations.write().await;

        let existing = rides
            .get_mut(&record.ride.id)
            .ok_or_else(|| TrackerError::ride_not_found(&record.ride.id))?;
        if cancellations.iter().any(|c| c.ride.id == record.ride.id) {
            return Err(TrackerError::DuplicateRide(record.ride.id.clone()));
        }
        check_ride_write(existing, &record.ride)?;

        *existing = record.ride.clone();
        cancellations.insert(0, record.clone());

        tracing::info!("Cancellation recorded: {} ({})", record.ride.id, record.reason);
        Ok(record.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_cancellations(&self, driver_id: &str) -> TrackerResult<Vec<CancelledRide>> {
        self.ensure_driver(driver_id).await?;

        let mut records: Vec<CancelledRide> = self
            .cancellations
            .read()
            .await
            .iter()
            .filter(|record| record.ride.driver_id == driver_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at));
        Ok(records)
    }
}
