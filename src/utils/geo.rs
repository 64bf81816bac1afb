// src/utils/geo.rs
use crate::models::ride::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceArea {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Sheikh Zayed, District 8.
pub const SHEIKH_ZAYED_BOUNDS: ServiceArea = ServiceArea {
    min_lat: 30.0,
    max_lat: 30.1,
    min_lng: 30.9,
    max_lng: 31.1,
};

pub fn default_location() -> Location {
    Location::new(30.05, 31.01)
}

impl ServiceArea {
    pub fn contains(&self, location: &Location) -> bool {
        location.latitude >= self.min_lat
            && location.latitude <= self.max_lat
            && location.longitude >= self.min_lng
            && location.longitude <= self.max_lng
    }

    /// Pulls a coordinate onto the nearest edge of the area. Accuracy and
    /// altitude are kept as reported.
    pub fn clamp(&self, location: &Location) -> Location {
        Location {
            latitude: location.latitude.clamp(self.min_lat, self.max_lat),
            longitude: location.longitude.clamp(self.min_lng, self.max_lng),
            accuracy: location.accuracy,
            altitude: location.altitude,
        }
    }

    pub fn validate_ride_locations(&self, pickup_points: &[Location], destination: &Location) -> (Vec<Location>, Location) {
        (
            pickup_points.iter().map(|point| self.clamp(point)).collect(),
            self.clamp(destination),
        )
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: &Location, to: &Location) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_clamp() {
        let area = SHEIKH_ZAYED_BOUNDS;
        assert!(area.contains(&default_location()));

        let outside = Location {
            latitude: 29.965,
            longitude: 31.265,
            accuracy: Some(5.0),
            altitude: None,
        };
        assert!(!area.contains(&outside));

        let clamped = area.clamp(&outside);
        assert_eq!(clamped.latitude, 30.0);
        assert_eq!(clamped.longitude, 31.1);
        assert_eq!(clamped.accuracy, Some(5.0));
        assert!(area.contains(&clamped));
    }

    #[test]
    fn test_validate_ride_locations() {
        let pickups = vec![Location::new(30.052, 31.012), Location::new(30.2, 30.0)];
        let (points, destination) = SHEIKH_ZAYED_BOUNDS.validate_ride_locations(&pickups, &Location::new(29.9, 31.05));
        assert_eq!(points[0], pickups[0]);
        assert_eq!(points[1], Location::new(30.1, 30.9));
        assert_eq!(destination, Location::new(30.0, 31.05));
    }

    #[test]
    fn test_haversine() {
        let a = Location::new(30.05, 31.01);
        assert_eq!(haversine_km(&a, &a), 0.0);

        // 0.001 degrees of latitude is roughly 111 metres
        let b = Location::new(30.051, 31.01);
        let km = haversine_km(&a, &b);
        assert!((km - 0.111).abs() < 0.001, "got {}", km);
    }
}
