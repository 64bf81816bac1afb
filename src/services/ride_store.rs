// src/services/ride_store.rs
//! In-memory ride lifecycle for one driver session.
//!
//! A ride lives in exactly one of `upcoming`, `active`, `completed` or the
//! `cancelled` archive, and the collection always mirrors its status. Every
//! operation validates before it mutates, so a failed call leaves the store
//! untouched.
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, Location, Ride, RideStatus, RideTransition},
        stats::RideStats,
    },
    services::stats_service::calculate_ride_stats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RideSlot {
    Upcoming(usize),
    Active,
    Completed(usize),
    Cancelled(usize),
}

#[derive(Debug, Clone)]
pub struct RideLifecycleStore {
    profile: DriverProfile,
    upcoming: Vec<Ride>,
    active: Option<Ride>,
    completed: Vec<Ride>,
    cancelled: Vec<CancelledRide>,
    current_location: Option<Location>,
}

impl RideLifecycleStore {
    pub fn new(profile: DriverProfile) -> Self {
        let current_location = profile.current_location.clone();
        Self {
            profile,
            upcoming: Vec::new(),
            active: None,
            completed: Vec::new(),
            cancelled: Vec::new(),
            current_location,
        }
    }

    /// Builds a store from whatever the backend returned, routing each ride
    /// into the collection its status names.
    pub fn from_parts(
        profile: DriverProfile,
        rides: Vec<Ride>,
        cancellations: Vec<CancelledRide>,
    ) -> TrackerResult<Self> {
        let mut store = Self::new(profile);
        let mut seen = HashSet::new();

        for ride in rides {
            ride.validate()?;
            store.check_owner(&ride)?;
            if !seen.insert(ride.id.clone()) {
                return Err(TrackerError::DuplicateRide(ride.id));
            }

            match ride.status {
                RideStatus::Scheduled => store.upcoming.push(ride),
                RideStatus::InProgress => {
                    if let Some(active) = &store.active {
                        return Err(TrackerError::RideAlreadyActive {
                            active_ride_id: active.id.clone(),
                            requested_ride_id: ride.id,
                        });
                    }
                    store.active = Some(ride);
                }
                RideStatus::Completed => store.completed.push(ride),
                RideStatus::Cancelled => {
                    return Err(TrackerError::validation_error(
                        "status",
                        format!("cancelled ride {} must be loaded as a cancellation record", ride.id),
                    ));
                }
            }
        }

        for record in cancellations {
            record.ride.validate()?;
            store.check_owner(&record.ride)?;
            if record.ride.status != RideStatus::Cancelled {
                return Err(TrackerError::validation_error(
                    "status",
                    format!("cancellation record for ride {} is {}", record.ride.id, record.ride.status),
                ));
            }
            if !seen.insert(record.ride.id.clone()) {
                return Err(TrackerError::DuplicateRide(record.ride.id));
            }
            store.cancelled.push(record);
        }

        store.upcoming.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        store.completed.sort_by(|a, b| b.actual_end_time.cmp(&a.actual_end_time));
        store.cancelled.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at));

        Ok(store)
    }

    fn check_owner(&self, ride: &Ride) -> TrackerResult<()> {
        if ride.driver_id != self.profile.id {
            return Err(TrackerError::validation_error(
                "driverId",
                format!("ride {} belongs to driver {}, not {}", ride.id, ride.driver_id, self.profile.id),
            ));
        }
        Ok(())
    }

    pub fn profile(&self) -> &DriverProfile {
        &self.profile
    }

    pub fn upcoming(&self) -> &[Ride] {
        &self.upcoming
    }

    pub fn active(&self) -> Option<&Ride> {
        self.active.as_ref()
    }

    /// Most recent first.
    pub fn completed(&self) -> &[Ride] {
        &self.completed
    }

    /// Most recent first.
    pub fn cancelled(&self) -> &[CancelledRide] {
        &self.cancelled
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.current_location.as_ref()
    }

    pub fn find_ride(&self, ride_id: &str) -> Option<&Ride> {
        match self.locate(ride_id)? {
            RideSlot::Upcoming(index) => self.upcoming.get(index),
            RideSlot::Active => self.active.as_ref(),
            RideSlot::Completed(index) => self.completed.get(index),
            RideSlot::Cancelled(index) => self.cancelled.get(index).map(|record| &record.ride),
        }
    }

    fn locate(&self, ride_id: &str) -> Option<RideSlot> {
        if self.active.as_ref().is_some_and(|ride| ride.id == ride_id) {
            return Some(RideSlot::Active);
        }
        if let Some(index) = self.upcoming.iter().position(|ride| ride.id == ride_id) {
            return Some(RideSlot::Upcoming(index));
        }
        if let Some(index) = self.completed.iter().position(|ride| ride.id == ride_id) {
            return Some(RideSlot::Completed(index));
        }
        self.cancelled
            .iter()
            .position(|record| record.ride.id == ride_id)
            .map(RideSlot::Cancelled)
    }

    /// Locates a ride that may still move, or explains why it cannot move to
    /// `target`.
    fn locate_for(&self, ride_id: &str, target: RideStatus) -> TrackerResult<RideSlot> {
        let slot = self
            .locate(ride_id)
            .ok_or_else(|| TrackerError::ride_not_found(ride_id))?;

        let current = match slot {
            RideSlot::Upcoming(_) => RideStatus::Scheduled,
            RideSlot::Active => RideStatus::InProgress,
            RideSlot::Completed(_) => RideStatus::Completed,
            RideSlot::Cancelled(_) => RideStatus::Cancelled,
        };

        if !current.can_transition_to(target) {
            if current.is_terminal() {
                tracing::warn!("Ride {} is already {}", ride_id, current);
            }
            return Err(TrackerError::InvalidTransition {
                ride_id: ride_id.to_string(),
                from: current,
                to: target,
            });
        }

        Ok(slot)
    }

    /// Removes a movable ride from its collection. Terminal slots never get
    /// here since `locate_for` rejects them first.
    fn take(&mut self, slot: RideSlot) -> TrackerResult<Ride> {
        match slot {
            RideSlot::Upcoming(index) => Ok(self.upcoming.remove(index)),
            RideSlot::Active => self
                .active
                .take()
                .ok_or_else(|| TrackerError::internal_error("active slot is empty")),
            RideSlot::Completed(_) | RideSlot::Cancelled(_) => {
                Err(TrackerError::internal_error("terminal rides cannot be moved"))
            }
        }
    }

    /// Moves a scheduled ride into the active slot.
    pub fn start_ride(&mut self, ride_id: &str) -> TrackerResult<Ride> {
        let slot = self.locate_for(ride_id, RideStatus::InProgress)?;

        if let Some(active) = &self.active {
            return Err(TrackerError::RideAlreadyActive {
                active_ride_id: active.id.clone(),
                requested_ride_id: ride_id.to_string(),
            });
        }

        let ride = self.take(slot)?.with_status(RideStatus::InProgress);
        self.active = Some(ride.clone());

        tracing::info!("Ride started: {}", ride_id);
        Ok(ride)
    }

    pub fn complete_ride(&mut self, ride_id: &str) -> TrackerResult<Ride> {
        self.complete_ride_at(ride_id, Utc::now())
    }

    /// Completes the active ride or a scheduled one, stamping `ended_at` as
    /// the actual end time.
    pub fn complete_ride_at(&mut self, ride_id: &str, ended_at: DateTime<Utc>) -> TrackerResult<Ride> {
        let slot = self.locate_for(ride_id, RideStatus::Completed)?;
        self.profile.record_completion()?;

        let mut ride = self.take(slot)?.with_status(RideStatus::Completed);
        ride.actual_end_time = Some(ended_at);
        self.completed.insert(0, ride.clone());

        tracing::info!(
            "Ride completed: {} ({} km, {} min)",
            ride_id,
            ride.total_distance,
            ride.total_duration
        );
        Ok(ride)
    }

    pub fn cancel_ride(&mut self, ride_id: &str, reason: &str) -> TrackerResult<CancelledRide> {
        self.cancel_ride_at(ride_id, reason, Utc::now())
    }

    /// Cancels the active ride or a scheduled one. The reason is kept with
    /// the archived record and is not validated.
    pub fn cancel_ride_at(
        &mut self,
        ride_id: &str,
        reason: &str,
        cancelled_at: DateTime<Utc>,
    ) -> TrackerResult<CancelledRide> {
        let slot = self.locate_for(ride_id, RideStatus::Cancelled)?;
        self.profile.record_cancellation()?;

        let ride = self.take(slot)?.with_status(RideStatus::Cancelled);
        let record = CancelledRide {
            audit_id: Uuid::new_v4(),
            ride,
            reason: reason.to_string(),
            cancelled_at,
        };

        self.cancelled.insert(0, record.clone());

        tracing::info!("Ride cancelled: {} (reason: {})", ride_id, reason);
        Ok(record)
    }

    pub fn apply(&mut self, ride_id: &str, transition: RideTransition) -> TrackerResult<Ride> {
        match transition {
            RideTransition::Start => self.start_ride(ride_id),
            RideTransition::Complete => self.complete_ride(ride_id),
            RideTransition::Cancel { reason } => self.cancel_ride(ride_id, &reason).map(|record| record.ride),
        }
    }

    /// Maps a requested status onto the transition that reaches it, failing
    /// when the ride is unknown or the edge does not exist.
    pub fn transition_for(&self, ride_id: &str, status: RideStatus) -> TrackerResult<RideTransition> {
        self.locate_for(ride_id, status)?;

        match status {
            RideStatus::InProgress => Ok(RideTransition::Start),
            RideStatus::Completed => Ok(RideTransition::Complete),
            RideStatus::Cancelled => Ok(RideTransition::Cancel {
                reason: "status update".to_string(),
            }),
            RideStatus::Scheduled => Err(TrackerError::internal_error(
                "no lifecycle edge leads back to scheduled",
            )),
        }
    }

    /// Status-driven entry point. Only edges of the lifecycle are accepted;
    /// anything else fails with `InvalidTransition`.
    pub fn update_ride_status(&mut self, ride_id: &str, status: RideStatus) -> TrackerResult<Ride> {
        let transition = self.transition_for(ride_id, status)?;
        self.apply(ride_id, transition)
    }

    pub fn stats(&self) -> RideStats {
        calculate_ride_stats(&self.completed, self.profile.rating, self.cancelled.len() as u32)
    }

    /// Records the driver's latest position. Returns true when the profile's
    /// position changed.
    pub fn update_location(&mut self, location: Location) -> bool {
        let changed = self.profile.update_location(&location);
        self.current_location = Some(location);
        changed
    }

    /// Verifies the membership and counter invariants.
    pub fn check_invariants(&self) -> TrackerResult<()> {
        let mut seen = HashSet::new();
        let expected = self
            .upcoming
            .iter()
            .map(|ride| (ride, RideStatus::Scheduled))
            .chain(self.active.iter().map(|ride| (ride, RideStatus::InProgress)))
            .chain(self.completed.iter().map(|ride| (ride, RideStatus::Completed)))
            .chain(self.cancelled.iter().map(|record| (&record.ride, RideStatus::Cancelled)));

        for (ride, status) in expected {
            if ride.status != status {
                return Err(TrackerError::internal_error(format!(
                    "ride {} is {} but stored as {}",
                    ride.id, ride.status, status
                )));
            }
            if !seen.insert(ride.id.as_str()) {
                return Err(TrackerError::DuplicateRide(ride.id.clone()));
            }
            if (status == RideStatus::Completed) != ride.actual_end_time.is_some() {
                return Err(TrackerError::internal_error(format!(
                    "ride {} has an end time that does not match {}",
                    ride.id, status
                )));
            }
        }

        if !self.profile.counters_consistent() {
            return Err(TrackerError::internal_error(format!(
                "profile counters inconsistent: {} completed + {} cancelled > {} total",
                self.profile.completed_rides, self.profile.cancelled_rides, self.profile.total_rides
            )));
        }

        Ok(())
    }
}
