// src/services/location_service.rs
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tracing;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::ride::Location,
    utils::geo::haversine_km,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSettings {
    pub time_interval: Duration,
    pub distance_interval_m: f64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            time_interval: Duration::milliseconds(10_000),
            distance_interval_m: 50.0,
        }
    }
}

/// A position the tracker accepted, with the time it was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub location: Location,
    pub recorded_at: DateTime<Utc>,
}

/// Filters raw position updates down to the ones worth keeping and publishes
/// the latest accepted fix to any number of watchers.
///
/// An update is kept when the driver moved at least `distance_interval_m`
/// since the last fix, or when `time_interval` has passed. The first valid
/// update is always kept.
#[derive(Debug)]
pub struct LocationTracker {
    settings: LocationSettings,
    sender: watch::Sender<Option<LocationFix>>,
}

impl LocationTracker {
    pub fn new(settings: LocationSettings) -> Self {
        let (sender, _) = watch::channel(None);
        Self { settings, sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LocationFix>> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> Option<LocationFix> {
        self.sender.borrow().clone()
    }

    pub fn check(&self, location: &Location) -> TrackerResult<Option<LocationFix>> {
        self.check_at(location, Utc::now())
    }

    /// Decides whether `location` is worth keeping, without publishing it.
    /// Invalid coordinates are an error rather than a silent drop.
    pub fn check_at(&self, location: &Location, at: DateTime<Utc>) -> TrackerResult<Option<LocationFix>> {
        if !location.is_valid() {
            tracing::warn!(
                "Rejected location update: {}, {}",
                location.latitude,
                location.longitude
            );
            return Err(TrackerError::validation_error(
                "location",
                format!("invalid coordinates {}, {}", location.latitude, location.longitude),
            ));
        }

        let accept = match self.sender.borrow().as_ref() {
            None => true,
            Some(last) => {
                let moved_m = haversine_km(&last.location, location) * 1000.0;
                moved_m >= self.settings.distance_interval_m
                    || at - last.recorded_at >= self.settings.time_interval
            }
        };

        if !accept {
            tracing::debug!("Location update filtered");
            return Ok(None);
        }
        Ok(Some(LocationFix {
            location: location.clone(),
            recorded_at: at,
        }))
    }

    /// Makes `fix` the baseline for the filter and hands it to watchers.
    pub fn publish(&self, fix: LocationFix) {
        tracing::debug!("Location accepted: {}, {}", fix.location.latitude, fix.location.longitude);
        self.sender.send_replace(Some(fix));
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(LocationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap()
    }

    fn offer(tracker: &LocationTracker, location: Location, at: DateTime<Utc>) -> bool {
        match tracker.check_at(&location, at).unwrap() {
            Some(fix) => {
                tracker.publish(fix);
                true
            }
            None => false,
        }
    }

    #[test]
    fn test_first_valid_update_is_accepted() {
        let tracker = LocationTracker::default();
        assert!(tracker.latest().is_none());

        assert!(offer(&tracker, Location::new(30.05, 31.01), t0()));
        assert_eq!(tracker.latest().unwrap().location, Location::new(30.05, 31.01));
    }

    #[test]
    fn test_check_does_not_publish() {
        let tracker = LocationTracker::default();
        let fix = tracker.check_at(&Location::new(30.05, 31.01), t0()).unwrap();

        assert!(fix.is_some());
        assert!(tracker.latest().is_none());
        // still the first fix as far as the filter knows
        assert!(tracker.check_at(&Location::new(30.05, 31.01), t0()).unwrap().is_some());
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let tracker = LocationTracker::default();
        for location in [
            Location::new(0.0, 0.0),
            Location::new(91.0, 31.0),
            Location::new(30.0, f64::NAN),
        ] {
            let result = tracker.check_at(&location, t0());
            assert!(matches!(result, Err(TrackerError::ValidationFailed(_))));
        }
        assert!(tracker.latest().is_none());
    }

    #[test]
    fn test_small_moves_filtered_until_interval() {
        let tracker = LocationTracker::default();
        offer(&tracker, Location::new(30.05, 31.01), t0());

        // about 11 metres, two seconds later
        let nudge = Location::new(30.0501, 31.01);
        assert!(!offer(&tracker, nudge.clone(), t0() + Duration::seconds(2)));
        assert_eq!(tracker.latest().unwrap().recorded_at, t0());

        assert!(offer(&tracker, nudge, t0() + Duration::seconds(10)));
    }

    #[test]
    fn test_distance_interval_accepts_early() {
        let tracker = LocationTracker::default();
        offer(&tracker, Location::new(30.05, 31.01), t0());

        // about 111 metres
        assert!(offer(&tracker, Location::new(30.051, 31.01), t0() + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_fix() {
        let tracker = LocationTracker::default();
        let mut receiver = tracker.subscribe();

        offer(&tracker, Location::new(30.05, 31.01), t0());
        receiver.changed().await.unwrap();
        let fix = receiver.borrow_and_update().clone().unwrap();
        assert_eq!(fix.location, Location::new(30.05, 31.01));
    }
}
