// src/models/driver.rs
use serde::{Deserialize, Serialize};

use crate::{
    errors::{TrackerError, TrackerResult},
    models::ride::Location,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Driver,
    Parent,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub model: String,
    pub plate: String,
    pub color: String,
    pub capacity: u32, // Seats
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub vehicle_info: VehicleInfo,
    pub license_number: String,
    pub total_rides: u32,
    pub rating: f32, // 1-5
    pub completed_rides: u32,
    pub cancelled_rides: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<Location>,
}

impl DriverProfile {
    /// completed + cancelled never exceeds the lifetime total.
    pub fn counters_consistent(&self) -> bool {
        self.completed_rides as u64 + self.cancelled_rides as u64 <= self.total_rides as u64
    }

    pub fn record_completion(&mut self) -> TrackerResult<()> {
        let (completed, total) = bump(self.completed_rides, self.total_rides)?;
        self.completed_rides = completed;
        self.total_rides = total;
        Ok(())
    }

    pub fn record_cancellation(&mut self) -> TrackerResult<()> {
        let (cancelled, total) = bump(self.cancelled_rides, self.total_rides)?;
        self.cancelled_rides = cancelled;
        self.total_rides = total;
        Ok(())
    }

    /// Returns true when the stored position actually changed.
    pub fn update_location(&mut self, location: &Location) -> bool {
        let changed = match &self.current_location {
            Some(current) => !current.same_coordinates(location),
            None => true,
        };
        if changed {
            self.current_location = Some(location.clone());
        }
        changed
    }
}

/// Adds one to a counter and to the lifetime total, or neither.
fn bump(counter: u32, total: u32) -> TrackerResult<(u32, u32)> {
    match (counter.checked_add(1), total.checked_add(1)) {
        (Some(counter), Some(total)) => Ok((counter, total)),
        _ => Err(TrackerError::validation_error("totalRides", "ride counters are at their limit")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_data;

    #[test]
    fn test_counters_move_together() {
        let mut profile = mock_data::driver_profile();
        let total = profile.total_rides;

        profile.record_completion().unwrap();
        profile.record_cancellation().unwrap();

        assert_eq!(profile.total_rides, total + 2);
        assert_eq!(profile.completed_rides, 151);
        assert_eq!(profile.cancelled_rides, 3);
        assert!(profile.counters_consistent());
    }

    #[test]
    fn test_counters_at_limit_are_left_alone() {
        let mut profile = mock_data::driver_profile();
        profile.total_rides = u32::MAX;
        assert!(profile.counters_consistent());
        let before = profile.clone();

        assert!(matches!(profile.record_completion(), Err(TrackerError::ValidationFailed(_))));
        assert!(matches!(profile.record_cancellation(), Err(TrackerError::ValidationFailed(_))));
        assert_eq!(profile, before);
    }

    #[test]
    fn test_update_location_only_on_change() {
        let mut profile = mock_data::driver_profile();
        let same = Location::new(30.05, 31.01);
        assert!(!profile.update_location(&same));

        let moved = Location::new(30.06, 31.02);
        assert!(profile.update_location(&moved));
        assert_eq!(profile.current_location, Some(moved));
    }

    #[test]
    fn test_profile_json_shape() {
        let value = serde_json::to_value(mock_data::driver_profile()).unwrap();
        assert_eq!(value["role"], "driver");
        assert_eq!(value["vehicleInfo"]["plate"], "ABC-123");
        assert_eq!(value["completedRides"], 150);
    }
}
