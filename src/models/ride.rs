// src/models/ride.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::errors::{TrackerError, ValidationError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    Scheduled,   // Assigned by dispatch, waiting in the upcoming list
    InProgress,  // Driver started the ride
    Completed,   // Terminal
    Cancelled,   // Terminal
}

impl RideStatus {
    pub const ALL: [RideStatus; 4] = [
        RideStatus::Scheduled,
        RideStatus::InProgress,
        RideStatus::Completed,
        RideStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Scheduled => "scheduled",
            RideStatus::InProgress => "in-progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Edges of the ride lifecycle. Terminal states have no outgoing edges.
    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        match (self, next) {
            (RideStatus::Scheduled, RideStatus::InProgress) => true,
            (RideStatus::Scheduled, RideStatus::Completed) => true,
            (RideStatus::Scheduled, RideStatus::Cancelled) => true,
            (RideStatus::InProgress, RideStatus::Completed) => true,
            (RideStatus::InProgress, RideStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>, // Accuracy in meters
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
        }
    }

    /// Finite, inside the WGS84 ranges, and not the 0,0 placeholder GPS
    /// chips report before their first fix.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    pub fn same_coordinates(&self, other: &Location) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub driver_id: String,
    pub student_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_time: Option<DateTime<Utc>>,
    pub status: RideStatus,
    pub pickup_points: Vec<Location>,
    pub destination_location: Location,
    pub total_distance: f64, // in km
    pub total_duration: u32, // in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Ride {
    pub fn validate(&self) -> Result<(), TrackerError> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push(field_error("id", "must not be empty"));
        }
        if self.driver_id.trim().is_empty() {
            errors.push(field_error("driverId", "must not be empty"));
        }
        if self.student_ids.is_empty() {
            errors.push(field_error("studentIds", "must contain at least one student"));
        }
        let mut seen = HashSet::new();
        if !self.student_ids.iter().all(|id| seen.insert(id)) {
            errors.push(field_error("studentIds", "must not contain duplicates"));
        }
        if !self.total_distance.is_finite() || self.total_distance < 0.0 {
            errors.push(field_error("totalDistance", "must be a non-negative number of km"));
        }
        if self.estimated_end_time < self.start_time {
            errors.push(field_error("estimatedEndTime", "must not be before startTime"));
        }
        match (self.status, self.actual_end_time) {
            (RideStatus::Completed, None) => {
                errors.push(field_error("actualEndTime", "must be set on completed rides"));
            }
            (RideStatus::Scheduled | RideStatus::InProgress, Some(_)) => {
                errors.push(field_error("actualEndTime", "is only set when a ride completes"));
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::ValidationFailed(errors))
        }
    }

    pub fn with_status(mut self, status: RideStatus) -> Self {
        self.status = status;
        self
    }
}

fn field_error(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// The only ways a ride may move through its lifecycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RideTransition {
    Start,
    Complete,
    Cancel { reason: String },
}

impl RideTransition {
    pub fn target_status(&self) -> RideStatus {
        match self {
            RideTransition::Start => RideStatus::InProgress,
            RideTransition::Complete => RideStatus::Completed,
            RideTransition::Cancel { .. } => RideStatus::Cancelled,
        }
    }
}

/// Archived cancellation. Kept so cancelled rides stay auditable and
/// countable after they leave the upcoming/active collections.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancelledRide {
    pub audit_id: Uuid,
    pub ride: Ride,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

// Request Models
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewRide {
    pub student_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub pickup_points: Vec<Location>,
    pub destination_location: Location,
    pub total_distance: f64,
    pub total_duration: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRide {
    pub fn into_ride(self, id: String, driver_id: String) -> Ride {
        Ride {
            id,
            driver_id,
            student_ids: self.student_ids,
            start_time: self.start_time,
            estimated_end_time: self.estimated_end_time,
            actual_end_time: None,
            status: RideStatus::Scheduled,
            pickup_points: self.pickup_points,
            destination_location: self.destination_location,
            total_distance: self.total_distance,
            total_duration: self.total_duration,
            route: None,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub pickup_location: Location,
    pub parent_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_data;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&RideStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(RideStatus::parse("cancelled"), Some(RideStatus::Cancelled));
        assert_eq!(RideStatus::parse("in_progress"), None);
    }

    #[test]
    fn test_transition_graph() {
        use RideStatus::*;
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Scheduled));
        for next in RideStatus::ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_ride_json_uses_camel_case() {
        let ride = mock_data::upcoming_rides().remove(0);
        let value = serde_json::to_value(&ride).unwrap();
        assert_eq!(value["driverId"], "1");
        assert_eq!(value["totalDistance"], 12.5);
        assert_eq!(value["status"], "scheduled");
        assert!(value.get("actualEndTime").is_none());
    }

    #[test]
    fn test_validate_rejects_duplicate_and_empty_students() {
        let mut ride = mock_data::upcoming_rides().remove(0);
        ride.student_ids = vec!["student-1".to_string(), "student-1".to_string()];
        assert!(matches!(ride.validate(), Err(TrackerError::ValidationFailed(_))));

        ride.student_ids.clear();
        ride.total_distance = -1.0;
        match ride.validate() {
            Err(TrackerError::ValidationFailed(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"studentIds"));
                assert!(fields.contains(&"totalDistance"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_end_time_matches_status() {
        let completed = mock_data::completed_rides().remove(0);
        assert!(completed.validate().is_ok());

        let mut missing_end = completed.clone();
        missing_end.actual_end_time = None;
        assert!(missing_end.validate().is_err());

        let premature = completed.with_status(RideStatus::InProgress);
        assert!(premature.validate().is_err());
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::new(30.05, 31.01).is_valid());
        assert!(!Location::new(0.0, 0.0).is_valid());
        assert!(!Location::new(91.0, 31.0).is_valid());
        assert!(!Location::new(f64::NAN, 31.0).is_valid());
    }
}
