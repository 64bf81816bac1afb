// src/utils/mock_data.rs
// Seed data for the mock backend and the tests. Times are relative to the
// moment the fixtures are built.
use chrono::{DateTime, Duration, Utc};

use crate::models::{
    driver::{DriverProfile, UserRole, VehicleInfo},
    ride::{Location, Ride, RideStatus, Student},
};

pub const DRIVER_ID: &str = "1";

fn school() -> Location {
    Location::new(29.965, 31.265)
}

pub fn driver_profile() -> DriverProfile {
    DriverProfile {
        id: DRIVER_ID.to_string(),
        name: "John Doe".to_string(),
        email: "john@example.com".to_string(),
        phone: "+1234567890".to_string(),
        role: UserRole::Driver,
        profile_image: Some("https://via.placeholder.com/150".to_string()),
        vehicle_info: VehicleInfo {
            model: "Mercedes Sprinter".to_string(),
            plate: "ABC-123".to_string(),
            color: "Yellow".to_string(),
            capacity: 12,
        },
        license_number: "DL123456".to_string(),
        total_rides: 156,
        rating: 4.8,
        completed_rides: 150,
        cancelled_rides: 2,
        earnings: Some(8450.0),
        current_location: Some(Location::new(30.05, 31.01)),
    }
}

pub fn students() -> Vec<Student> {
    vec![
        Student {
            id: "student-1".to_string(),
            name: "Alice Johnson".to_string(),
            grade: "5th".to_string(),
            pickup_location: Location::new(30.052, 31.012),
            parent_id: "parent-1".to_string(),
        },
        Student {
            id: "student-2".to_string(),
            name: "Bob Smith".to_string(),
            grade: "4th".to_string(),
            pickup_location: Location::new(30.048, 31.008),
            parent_id: "parent-2".to_string(),
        },
        Student {
            id: "student-3".to_string(),
            name: "Charlie Brown".to_string(),
            grade: "3rd".to_string(),
            pickup_location: Location::new(30.055, 31.015),
            parent_id: "parent-3".to_string(),
        },
    ]
}

pub fn upcoming_rides() -> Vec<Ride> {
    upcoming_rides_at(Utc::now())
}

pub fn upcoming_rides_at(now: DateTime<Utc>) -> Vec<Ride> {
    vec![
        Ride {
            id: "ride-1".to_string(),
            driver_id: DRIVER_ID.to_string(),
            student_ids: vec!["student-1".to_string(), "student-2".to_string()],
            start_time: now + Duration::minutes(15),
            estimated_end_time: now + Duration::minutes(45),
            actual_end_time: None,
            status: RideStatus::Scheduled,
            pickup_points: vec![Location::new(30.052, 31.012), Location::new(30.048, 31.008)],
            destination_location: school(),
            total_distance: 12.5,
            total_duration: 30,
            route: None,
            notes: Some("Regular route".to_string()),
        },
        Ride {
            id: "ride-2".to_string(),
            driver_id: DRIVER_ID.to_string(),
            student_ids: vec!["student-3".to_string()],
            start_time: now + Duration::minutes(90),
            estimated_end_time: now + Duration::minutes(150),
            actual_end_time: None,
            status: RideStatus::Scheduled,
            pickup_points: vec![Location::new(30.055, 31.015)],
            destination_location: school(),
            total_distance: 8.3,
            total_duration: 25,
            route: None,
            notes: Some("Afternoon pickup".to_string()),
        },
    ]
}

pub fn completed_rides() -> Vec<Ride> {
    completed_rides_at(Utc::now())
}

/// Most recent first.
pub fn completed_rides_at(now: DateTime<Utc>) -> Vec<Ride> {
    vec![
        Ride {
            id: "ride-completed-1".to_string(),
            driver_id: DRIVER_ID.to_string(),
            student_ids: vec![
                "student-1".to_string(),
                "student-2".to_string(),
                "student-3".to_string(),
            ],
            start_time: now - Duration::minutes(120),
            estimated_end_time: now - Duration::minutes(90),
            actual_end_time: Some(now - Duration::minutes(84)),
            status: RideStatus::Completed,
            pickup_points: vec![
                Location::new(30.052, 31.012),
                Location::new(30.048, 31.008),
                Location::new(30.055, 31.015),
            ],
            destination_location: school(),
            total_distance: 18.2,
            total_duration: 35,
            route: None,
            notes: None,
        },
        Ride {
            id: "ride-completed-2".to_string(),
            driver_id: DRIVER_ID.to_string(),
            student_ids: vec!["student-1".to_string()],
            start_time: now - Duration::minutes(300),
            estimated_end_time: now - Duration::minutes(270),
            actual_end_time: Some(now - Duration::minutes(264)),
            status: RideStatus::Completed,
            pickup_points: vec![Location::new(30.052, 31.012)],
            destination_location: school(),
            total_distance: 9.8,
            total_duration: 28,
            route: None,
            notes: None,
        },
    ]
}
