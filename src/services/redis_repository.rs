// src/services/redis_repository.rs
use async_trait::async_trait;
use redis::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use tracing;

use crate::{
    errors::{TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, NewRide, Ride, RideStatus},
    },
    services::repository::{check_ride_save, check_ride_write, order_rides, RideRepository},
    utils::id_generator::generate_ride_id,
};

/// Colon-joined redis key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreKey(Vec<String>);

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

pub struct StoreKeys;

impl StoreKeys {
    pub fn profile(driver_id: &str) -> StoreKey {
        StoreKey(vec!["driver".to_string(), "profile".to_string(), driver_id.to_string()])
    }

    pub fn ride(ride_id: &str) -> StoreKey {
        StoreKey(vec!["ride".to_string(), ride_id.to_string()])
    }

    /// Set of ride ids the driver has in `status`.
    pub fn rides_by_status(driver_id: &str, status: RideStatus) -> StoreKey {
        StoreKey(vec![
            "driver".to_string(),
            "rides".to_string(),
            driver_id.to_string(),
            status.as_str().to_string(),
        ])
    }

    /// List of cancellation records, newest at the head.
    pub fn cancellations(driver_id: &str) -> StoreKey {
        StoreKey(vec![
            "driver".to_string(),
            "cancellations".to_string(),
            driver_id.to_string(),
        ])
    }
}

/// Redis-backed repository. Rides and profiles are JSON strings; per-driver
/// status sets index the rides, and cancellations live in a list.
pub struct RedisRideRepository {
    client: Client,
}

impl RedisRideRepository {
    pub fn new(redis_url: &str) -> TrackerResult<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> TrackerResult<redis::aio::Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &StoreKey) -> TrackerResult<Option<T>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = redis::cmd("GET")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &StoreKey, value: &T) -> TrackerResult<()> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key.to_string())
            .arg(json)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &StoreKey) -> TrackerResult<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    async fn ensure_driver(&self, driver_id: &str) -> TrackerResult<()> {
        if self.exists(&StoreKeys::profile(driver_id)).await? {
            Ok(())
        } else {
            Err(TrackerError::driver_not_found(driver_id))
        }
    }

    /// Writes a ride and moves its id between status sets in one
    /// transaction.
    async fn write_ride(&self, ride: &Ride, previous: Option<RideStatus>) -> TrackerResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        stage_ride(&mut pipe, ride, previous)?;

        let mut conn = self.connection().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Loads a profile and its rides into redis, replacing what is there.
    pub async fn seed(&self, profile: &DriverProfile, rides: &[Ride]) -> TrackerResult<()> {
        self.set_json(&StoreKeys::profile(&profile.id), profile).await?;
        for ride in rides {
            ride.validate()?;
            self.write_ride(ride, None).await?;
        }
        tracing::info!("Seeded {} rides for driver {}", rides.len(), profile.id);
        Ok(())
    }
}

/// Queues the ride value and its status-set move onto `pipe`.
fn stage_ride(pipe: &mut redis::Pipeline, ride: &Ride, previous: Option<RideStatus>) -> TrackerResult<()> {
    pipe.cmd("SET")
        .arg(StoreKeys::ride(&ride.id).to_string())
        .arg(serde_json::to_string(ride)?)
        .ignore();

    if let Some(previous) = previous.filter(|status| *status != ride.status) {
        pipe.cmd("SREM")
            .arg(StoreKeys::rides_by_status(&ride.driver_id, previous).to_string())
            .arg(&ride.id)
            .ignore();
    }
    pipe.cmd("SADD")
        .arg(StoreKeys::rides_by_status(&ride.driver_id, ride.status).to_string())
        .arg(&ride.id)
        .ignore();
    Ok(())
}

/// The ride write and the archive push, as one MULTI/EXEC.
fn cancellation_pipeline(record: &CancelledRide, previous: RideStatus) -> TrackerResult<redis::Pipeline> {
    let mut pipe = redis::pipe();
    pipe.atomic();
    stage_ride(&mut pipe, &record.ride, Some(previous))?;
    pipe.cmd("LPUSH")
        .arg(StoreKeys::cancellations(&record.ride.driver_id).to_string())
        .arg(serde_json::to_string(record)?)
        .ignore();
    Ok(pipe)
}

#[async_trait]
impl RideRepository for RedisRideRepository {
    #[tracing::instrument(skip(self))]
    async fn fetch_profile(&self, driver_id: &str) -> TrackerResult<DriverProfile> {
        self.get_json(&StoreKeys::profile(driver_id))
            .await?
            .ok_or_else(|| TrackerError::driver_not_found(driver_id))
    }

    #[tracing::instrument(skip(self, profile), fields(driver_id = %profile.id))]
    async fn save_profile(&self, profile: &DriverProfile) -> TrackerResult<DriverProfile> {
        if !profile.counters_consistent() {
            return Err(TrackerError::validation_error(
                "totalRides",
                "completed and cancelled rides exceed total rides",
            ));
        }
        self.ensure_driver(&profile.id).await?;
        self.set_json(&StoreKeys::profile(&profile.id), profile).await?;
        Ok(profile.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_rides(&self, driver_id: &str, status: RideStatus) -> TrackerResult<Vec<Ride>> {
        self.ensure_driver(driver_id).await?;

        let mut conn = self.connection().await?;
        let ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(StoreKeys::rides_by_status(driver_id, status).to_string())
            .query_async(&mut conn)
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| StoreKeys::ride(id).to_string()).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await?;

        let mut rides = Vec::with_capacity(values.len());
        for json in values.into_iter().flatten() {
            rides.push(serde_json::from_str::<Ride>(&json)?);
        }
        order_rides(&mut rides, status);

        tracing::debug!("Found {} rides", rides.len());
        Ok(rides)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
        self.get_json(&StoreKeys::ride(ride_id))
            .await?
            .ok_or_else(|| TrackerError::ride_not_found(ride_id))
    }

    #[tracing::instrument(skip(self, ride))]
    async fn create_ride(&self, driver_id: &str, ride: NewRide) -> TrackerResult<Ride> {
        self.ensure_driver(driver_id).await?;

        let ride = ride.into_ride(generate_ride_id(), driver_id.to_string());
        ride.validate()?;
        if self.exists(&StoreKeys::ride(&ride.id)).await? {
            return Err(TrackerError::DuplicateRide(ride.id));
        }
        self.write_ride(&ride, None).await?;

        tracing::info!("Ride created: {}", ride.id);
        Ok(ride)
    }

    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id, status = %ride.status))]
    async fn save_ride(&self, ride: &Ride) -> TrackerResult<Ride> {
        ride.validate()?;
        let existing = self.fetch_ride(&ride.id).await?;
        check_ride_save(&existing, ride)?;
        self.write_ride(ride, Some(existing.status)).await?;
        Ok(ride.clone())
    }

    #[tracing::instrument(skip(self, record), fields(ride_id = %record.ride.id))]
    async fn record_cancellation(&self, record: &CancelledRide) -> TrackerResult<CancelledRide> {
        if record.ride.status != RideStatus::Cancelled {
            return Err(TrackerError::validation_error(
                "status",
                format!("cancellation record carries a {} ride", record.ride.status),
            ));
        }
        record.ride.validate()?;

        // WATCH keeps the check and the write on one view of the ride: a
        // concurrent change aborts the EXEC.
        let ride_key = StoreKeys::ride(&record.ride.id).to_string();
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("WATCH").arg(&ride_key).query_async(&mut conn).await?;

        let data: Option<String> = redis::cmd("GET").arg(&ride_key).query_async(&mut conn).await?;
        let existing: Ride = match data {
            Some(json) => serde_json::from_str(&json)?,
            None => return Err(TrackerError::ride_not_found(&record.ride.id)),
        };
        if existing.status == RideStatus::Cancelled {
            return Err(TrackerError::DuplicateRide(record.ride.id.clone()));
        }
        check_ride_write(&existing, &record.ride)?;

        let pipe = cancellation_pipeline(record, existing.status)?;
        let committed: Option<()> = pipe.query_async(&mut conn).await?;
        if committed.is_none() {
            return Err(TrackerError::Conflict(format!(
                "ride {} changed while it was being cancelled",
                record.ride.id
            )));
        }

        tracing::info!("Cancellation recorded: {} ({})", record.ride.id, record.reason);
        Ok(record.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_cancellations(&self, driver_id: &str) -> TrackerResult<Vec<CancelledRide>> {
        self.ensure_driver(driver_id).await?;

        let mut conn = self.connection().await?;
        let values: Vec<String> = redis::cmd("LRANGE")
            .arg(StoreKeys::cancellations(driver_id).to_string())
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        let mut records = values
            .iter()
            .map(|json| serde_json::from_str::<CancelledRide>(json))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at));
        Ok(records)
    }
}
