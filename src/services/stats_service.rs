// src/services/stats_service.rs
use crate::models::{ride::Ride, stats::RideStats};

/// Pure reducer over the completed-rides collection. The cancelled count is
/// supplied by the caller since cancelled rides never reach `completed_rides`.
///
/// Sums run in collection order, so the same input always produces
/// bit-identical output.
pub fn calculate_ride_stats(completed_rides: &[Ride], rating: f32, cancelled_rides: u32) -> RideStats {
    let completed = completed_rides.len() as u32;
    let total_km_driven: f64 = completed_rides.iter().map(|ride| ride.total_distance).sum();
    let total_minutes: u64 = completed_rides.iter().map(|ride| ride.total_duration as u64).sum();

    RideStats {
        total_rides: completed + cancelled_rides,
        completed_rides: completed,
        cancelled_rides,
        average_rating: rating,
        total_km_driven,
        total_hours_driven: total_minutes as f64 / 60.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_data;

    #[test]
    fn test_sums_distance_and_hours() {
        let rides = mock_data::completed_rides();
        let stats = calculate_ride_stats(&rides, 4.8, 0);

        assert_eq!(stats.total_rides, 2);
        assert_eq!(stats.completed_rides, 2);
        assert_eq!(stats.cancelled_rides, 0);
        assert_eq!(stats.average_rating, 4.8);
        assert_eq!(stats.total_km_driven, 18.2 + 9.8);
        assert_eq!(stats.total_hours_driven, 63.0 / 60.0);
    }

    #[test]
    fn test_single_ride_contribution() {
        let mut ride = mock_data::upcoming_rides().remove(0);
        ride.status = crate::models::ride::RideStatus::Completed;
        ride.actual_end_time = Some(ride.estimated_end_time);

        let stats = calculate_ride_stats(&[ride], 5.0, 1);
        assert_eq!(stats.total_km_driven, 12.5);
        assert_eq!(stats.total_hours_driven, 0.5);
        assert_eq!(stats.total_rides, 2);
    }

    #[test]
    fn test_idempotent() {
        let rides = mock_data::completed_rides();
        let first = calculate_ride_stats(&rides, 4.8, 2);
        let second = calculate_ride_stats(&rides, 4.8, 2);

        assert_eq!(first, second);
        assert_eq!(first.total_km_driven.to_bits(), second.total_km_driven.to_bits());
        assert_eq!(first.total_hours_driven.to_bits(), second.total_hours_driven.to_bits());
    }

    #[test]
    fn test_empty_collection() {
        let stats = calculate_ride_stats(&[], 4.2, 0);
        assert_eq!(stats.total_rides, 0);
        assert_eq!(stats.total_km_driven, 0.0);
        assert_eq!(stats.total_hours_driven, 0.0);
        assert_eq!(stats.completion_rate(), 0.0);
    }
}
