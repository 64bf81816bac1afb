// src/services/ride_service.rs
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        ride::{CancelledRide, Location, Ride, RideStatus, RideTransition},
        stats::RideStats,
    },
    services::{
        location_service::{LocationFix, LocationSettings, LocationTracker},
        repository::RideRepository,
        ride_store::RideLifecycleStore,
    },
};

#[async_trait]
pub trait RideOperations: Send + Sync {
    async fn refresh(&self) -> TrackerResult<()>;
    async fn start_ride(&self, ride_id: &str) -> TrackerResult<Ride>;
    async fn complete_ride(&self, ride_id: &str) -> TrackerResult<Ride>;
    async fn cancel_ride(&self, ride_id: &str, reason: &str) -> TrackerResult<CancelledRide>;
    async fn update_ride_status(&self, ride_id: &str, status: RideStatus) -> TrackerResult<Ride>;
    async fn stats(&self) -> RideStats;
    async fn snapshot(&self) -> RideLifecycleStore;
    async fn update_location(&self, location: Location) -> TrackerResult<bool>;
}

/// One driver's session: the lifecycle store plus the repository it is
/// mirrored to.
///
/// Transitions run on a copy of the store and are committed only once the
/// repository accepted every write, so a failed call leaves the session as it
/// was. The store lock is held across the writes, which keeps transitions
/// strictly one at a time.
pub struct RideService {
    driver_id: String,
    repository: Arc<dyn RideRepository>,
    store: Mutex<RideLifecycleStore>,
    tracker: LocationTracker,
}

impl RideService {
    pub async fn load(
        driver_id: &str,
        repository: Arc<dyn RideRepository>,
        location: LocationSettings,
    ) -> TrackerResult<Self> {
        let store = Self::fetch_store(repository.as_ref(), driver_id).await?;

        tracing::info!(
            "Session loaded for driver {}: {} upcoming, {} completed, {} cancelled",
            driver_id,
            store.upcoming().len(),
            store.completed().len(),
            store.cancelled().len()
        );

        Ok(Self {
            driver_id: driver_id.to_string(),
            repository,
            store: Mutex::new(store),
            tracker: LocationTracker::new(location),
        })
    }

    async fn fetch_store(repository: &dyn RideRepository, driver_id: &str) -> TrackerResult<RideLifecycleStore> {
        let (profile, scheduled, in_progress, completed, cancellations) = futures::try_join!(
            repository.fetch_profile(driver_id),
            repository.fetch_rides(driver_id, RideStatus::Scheduled),
            repository.fetch_rides(driver_id, RideStatus::InProgress),
            repository.fetch_rides(driver_id, RideStatus::Completed),
            repository.fetch_cancellations(driver_id),
        )?;

        let mut rides = scheduled;
        rides.extend(in_progress);
        rides.extend(completed);

        RideLifecycleStore::from_parts(profile, rides, cancellations)
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub fn subscribe_location(&self) -> watch::Receiver<Option<LocationFix>> {
        self.tracker.subscribe()
    }

    /// Runs `transition` against a copy of the store, writes the outcome
    /// through the repository and commits the copy.
    async fn commit(
        &self,
        ride_id: &str,
        transition: RideTransition,
    ) -> TrackerResult<(Ride, Option<CancelledRide>)> {
        let mut store = self.store.lock().await;
        let mut next = store.clone();
        tracing::debug!("Applying {} -> {}", ride_id, transition.target_status());

        let outcome = match transition {
            RideTransition::Start => {
                let ride = next.start_ride(ride_id)?;
                self.repository.save_ride(&ride).await?;
                (ride, None)
            }
            RideTransition::Complete => {
                let ride = next.complete_ride(ride_id)?;
                self.repository.save_ride(&ride).await?;
                self.repository.save_profile(next.profile()).await?;
                (ride, None)
            }
            RideTransition::Cancel { reason } => {
                let record = next.cancel_ride(ride_id, &reason)?;
                self.repository.record_cancellation(&record).await?;
                self.repository.save_profile(next.profile()).await?;
                (record.ride.clone(), Some(record))
            }
        };

        *store = next;
        Ok(outcome)
    }
}

#[async_trait]
impl RideOperations for RideService {
    #[tracing::instrument(skip(self), fields(driver_id = %self.driver_id))]
    async fn refresh(&self) -> TrackerResult<()> {
        let fresh = Self::fetch_store(self.repository.as_ref(), &self.driver_id).await?;
        *self.store.lock().await = fresh;
        tracing::debug!("Session refreshed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn start_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
        let (ride, _) = self.commit(ride_id, RideTransition::Start).await?;
        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn complete_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
        let (ride, _) = self.commit(ride_id, RideTransition::Complete).await?;
        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_ride(&self, ride_id: &str, reason: &str) -> TrackerResult<CancelledRide> {
        let transition = RideTransition::Cancel {
            reason: reason.to_string(),
        };
        match self.commit(ride_id, transition).await? {
            (_, Some(record)) => Ok(record),
            (ride, None) => Err(TrackerError::internal_error(format!(
                "cancellation of {} produced no record",
                ride.id
            ))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn update_ride_status(&self, ride_id: &str, status: RideStatus) -> TrackerResult<Ride> {
        let transition = self.store.lock().await.transition_for(ride_id, status)?;
        let (ride, _) = self.commit(ride_id, transition).await?;
        Ok(ride)
    }

    async fn stats(&self) -> RideStats {
        self.store.lock().await.stats()
    }

    async fn snapshot(&self) -> RideLifecycleStore {
        self.store.lock().await.clone()
    }

    /// Feeds a raw position through the tracker. Accepted positions update
    /// the profile, which is saved only when the coordinates changed. The fix
    /// reaches watchers once the store holds it.
    #[tracing::instrument(skip(self, location))]
    async fn update_location(&self, location: Location) -> TrackerResult<bool> {
        let mut store = self.store.lock().await;
        let Some(fix) = self.tracker.check(&location)? else {
            return Ok(false);
        };

        let mut next = store.clone();
        if next.update_location(location) {
            self.repository.save_profile(next.profile()).await?;
        }
        *store = next;
        self.tracker.publish(fix);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{driver::DriverProfile, ride::NewRide},
        services::memory_repository::MemoryRideRepository,
    };

    /// Reads go to the seeded memory repository, writes always fail.
    struct ReadOnlyRepository(MemoryRideRepository);

    #[async_trait]
    impl RideRepository for ReadOnlyRepository {
        async fn fetch_profile(&self, driver_id: &str) -> TrackerResult<DriverProfile> {
            self.0.fetch_profile(driver_id).await
        }
        async fn save_profile(&self, _: &DriverProfile) -> TrackerResult<DriverProfile> {
            Err(TrackerError::ServiceUnavailable("backend".to_string()))
        }
        async fn fetch_rides(&self, driver_id: &str, status: RideStatus) -> TrackerResult<Vec<Ride>> {
            self.0.fetch_rides(driver_id, status).await
        }
        async fn fetch_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
            self.0.fetch_ride(ride_id).await
        }
        async fn create_ride(&self, _: &str, _: NewRide) -> TrackerResult<Ride> {
            Err(TrackerError::ServiceUnavailable("backend".to_string()))
        }
        async fn save_ride(&self, _: &Ride) -> TrackerResult<Ride> {
            Err(TrackerError::ServiceUnavailable("backend".to_string()))
        }
        async fn record_cancellation(&self, _: &CancelledRide) -> TrackerResult<CancelledRide> {
            Err(TrackerError::ServiceUnavailable("backend".to_string()))
        }
        async fn fetch_cancellations(&self, driver_id: &str) -> TrackerResult<Vec<CancelledRide>> {
            self.0.fetch_cancellations(driver_id).await
        }
    }

    async fn session() -> (RideService, Arc<MemoryRideRepository>) {
        let repository = Arc::new(MemoryRideRepository::seeded());
        let service = RideService::load("1", repository.clone(), LocationSettings::default())
            .await
            .unwrap();
        (service, repository)
    }

    #[tokio::test]
    async fn test_load_builds_store() {
        let (service, _) = session().await;
        let store = service.snapshot().await;

        assert_eq!(store.profile().id, "1");
        assert_eq!(store.upcoming().len(), 2);
        assert_eq!(store.completed().len(), 2);
        assert!(store.active().is_none());
        assert_eq!(service.stats().await.total_km_driven, 18.2 + 9.8);
    }

    #[tokio::test]
    async fn test_load_unknown_driver() {
        let repository = Arc::new(MemoryRideRepository::seeded());
        let result = RideService::load("42", repository, LocationSettings::default()).await;
        assert!(matches!(result, Err(TrackerError::DriverNotFound(_))));
    }

    #[tokio::test]
    async fn test_transitions_are_persisted() {
        let (service, repository) = session().await;

        service.start_ride("ride-1").await.unwrap();
        assert_eq!(repository.fetch_ride("ride-1").await.unwrap().status, RideStatus::InProgress);

        let ride = service.complete_ride("ride-1").await.unwrap();
        let stored = repository.fetch_ride("ride-1").await.unwrap();
        assert_eq!(stored, ride);
        assert!(stored.actual_end_time.is_some());
        assert_eq!(repository.fetch_profile("1").await.unwrap().completed_rides, 151);

        let record = service.cancel_ride("ride-2", "school closed").await.unwrap();
        assert_eq!(repository.fetch_cancellations("1").await.unwrap(), vec![record]);
        assert_eq!(repository.fetch_profile("1").await.unwrap().cancelled_rides, 3);

        let store = service.snapshot().await;
        assert!(store.upcoming().is_empty());
        assert!(store.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_refresh_matches_persisted_state() {
        let (service, repository) = session().await;
        service.start_ride("ride-2").await.unwrap();

        let other = RideService::load("1", repository, LocationSettings::default())
            .await
            .unwrap();
        let store = other.snapshot().await;
        assert_eq!(store.active().map(|r| r.id.as_str()), Some("ride-2"));

        service.refresh().await.unwrap();
        assert_eq!(
            service.snapshot().await.active().map(|r| r.id.as_str()),
            Some("ride-2")
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_session_unchanged() {
        let repository = Arc::new(ReadOnlyRepository(MemoryRideRepository::seeded()));
        let service = RideService::load("1", repository, LocationSettings::default())
            .await
            .unwrap();
        let before = format!("{:?}", service.snapshot().await);

        assert!(matches!(
            service.start_ride("ride-1").await,
            Err(TrackerError::ServiceUnavailable(_))
        ));
        assert!(service.cancel_ride("ride-2", "rain").await.is_err());
        assert!(service.complete_ride("ride-1").await.is_err());

        assert_eq!(format!("{:?}", service.snapshot().await), before);
    }

    #[tokio::test]
    async fn test_update_ride_status_through_service() {
        let (service, repository) = session().await;

        let ride = service.update_ride_status("ride-1", RideStatus::InProgress).await.unwrap();
        assert_eq!(ride.status, RideStatus::InProgress);

        assert!(matches!(
            service.update_ride_status("ride-1", RideStatus::Scheduled).await,
            Err(TrackerError::InvalidTransition { .. })
        ));
        assert!(matches!(
            service.update_ride_status("missing", RideStatus::Completed).await,
            Err(TrackerError::RideNotFound(_))
        ));

        service.update_ride_status("ride-1", RideStatus::Cancelled).await.unwrap();
        let records = repository.fetch_cancellations("1").await.unwrap();
        assert_eq!(records[0].reason, "status update");
    }

    #[tokio::test]
    async fn test_update_location() {
        let (service, repository) = session().await;
        let mut receiver = service.subscribe_location();

        assert!(service.update_location(Location::new(30.06, 31.02)).await.unwrap());
        assert!(receiver.has_changed().unwrap());
        assert_eq!(
            receiver.borrow_and_update().as_ref().map(|fix| fix.location.clone()),
            Some(Location::new(30.06, 31.02))
        );
        assert_eq!(
            repository.fetch_profile("1").await.unwrap().current_location,
            Some(Location::new(30.06, 31.02))
        );

        // a few metres away, right after: filtered
        assert!(!service.update_location(Location::new(30.06001, 31.02)).await.unwrap());
        assert!(service.update_location(Location::new(0.0, 0.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_location_save_publishes_nothing() {
        let repository = Arc::new(ReadOnlyRepository(MemoryRideRepository::seeded()));
        let service = RideService::load("1", repository, LocationSettings::default())
            .await
            .unwrap();
        let receiver = service.subscribe_location();
        let moved = Location::new(30.06, 31.02);

        assert!(matches!(
            service.update_location(moved.clone()).await,
            Err(TrackerError::ServiceUnavailable(_))
        ));
        assert!(!receiver.has_changed().unwrap());
        assert!(receiver.borrow().is_none());
        assert_eq!(
            service.snapshot().await.current_location(),
            Some(&Location::new(30.05, 31.01))
        );

        // the same position is tried again rather than filtered
        assert!(matches!(
            service.update_location(moved).await,
            Err(TrackerError::ServiceUnavailable(_))
        ));
    }
}
