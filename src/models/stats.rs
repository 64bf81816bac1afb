// src/models/stats.rs
use serde::{Deserialize, Serialize};

use crate::utils::format::round_to;

/// Derived from the completed-rides collection; never stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    pub total_rides: u32,
    pub completed_rides: u32,
    pub cancelled_rides: u32,
    pub average_rating: f32,
    pub total_km_driven: f64,
    pub total_hours_driven: f64,
}

impl RideStats {
    /// Percentage of finished rides that completed, rounded to two decimals.
    pub fn completion_rate(&self) -> f64 {
        if self.total_rides == 0 {
            return 0.0;
        }
        round_to(self.completed_rides as f64 / self.total_rides as f64 * 100.0, 2)
    }
}
