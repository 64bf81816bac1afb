// src/state.rs
use std::sync::Arc;

use crate::{
    config::{AppConfig, StoreBackend},
    errors::TrackerResult,
    models::driver::DriverProfile,
    models::ride::Ride,
    services::{
        memory_repository::MemoryRideRepository, redis_repository::RedisRideRepository,
        repository::RideRepository,
    },
    utils::mock_data,
};

pub struct AppState {
    pub repository: Arc<dyn RideRepository>,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the backend state with the configured storage, seeded with the
    /// fixture driver and rides.
    pub async fn new(config: AppConfig) -> TrackerResult<Self> {
        let repository: Arc<dyn RideRepository> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryRideRepository::seeded()),
            StoreBackend::Redis => {
                let redis = RedisRideRepository::new(&config.redis_url)?;
                let (profile, rides) = fixtures();
                redis.seed(&profile, &rides).await?;
                Arc::new(redis)
            }
        };

        tracing::info!("Using {:?} ride storage", config.backend);
        Ok(Self { repository, config })
    }

    pub fn with_repository(repository: Arc<dyn RideRepository>, config: AppConfig) -> Self {
        Self { repository, config }
    }
}

fn fixtures() -> (DriverProfile, Vec<Ride>) {
    let mut rides = mock_data::upcoming_rides();
    rides.extend(mock_data::completed_rides());
    (mock_data::driver_profile(), rides)
}
