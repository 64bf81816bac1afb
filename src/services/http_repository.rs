// src/services/http_repository.rs
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing;
use uuid::Uuid;

use crate::{
    config::ApiConfig,
    errors::{ErrorResponse, TrackerError, TrackerResult},
    models::{
        driver::DriverProfile,
        ride::{CancelledRide, NewRide, Ride, RideStatus},
    },
    services::repository::RideRepository,
};

/// Talks to the ride backend over its REST API.
///
/// Reads are retried on transport failures and 5xx responses, up to
/// `retry_count` extra attempts. Writes go out once.
pub struct HttpRideRepository {
    config: ApiConfig,
    base: Url,
    client: Client,
}

impl HttpRideRepository {
    pub fn new(config: ApiConfig) -> TrackerResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| TrackerError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(TrackerError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, base, client })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so ids
    /// cannot escape their path segment.
    fn url(&self, segments: &[&str]) -> TrackerResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TrackerError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> TrackerResult<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.url(segments)?)
            .header("x-request-id", Uuid::new_v4().to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> TrackerResult<T> {
        let mut attempt = 0;
        loop {
            let result = match self.request(Method::GET, segments)?.query(query).send().await {
                Ok(response) => decode(response).await,
                Err(err) => Err(err.into()),
            };

            match result {
                Err(err) if attempt < self.config.retry_count && is_retryable(&err) => {
                    attempt += 1;
                    tracing::warn!(
                        "GET /{} failed ({}), retry {}/{}",
                        segments.join("/"),
                        err,
                        attempt,
                        self.config.retry_count
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send<B, T>(&self, method: Method, segments: &[&str], body: &B) -> TrackerResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(method, segments)?.json(body).send().await?;
        decode(response).await
    }
}

fn is_retryable(err: &TrackerError) -> bool {
    match err {
        TrackerError::NetworkTimeout | TrackerError::NetworkConnection(_) => true,
        TrackerError::ServiceUnavailable(_) => true,
        TrackerError::UpstreamStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Turns a backend response into either the payload or the typed error the
/// backend reported.
async fn decode<T: DeserializeOwned>(response: Response) -> TrackerResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    tracing::debug!("Backend error {}: {}", status, text);

    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => Err(TrackerError::from_response(status.as_u16(), body)),
        Err(_) => Err(TrackerError::UpstreamStatus {
            status: status.as_u16(),
            message: if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                text
            },
        }),
    }
}

#[async_trait]
impl RideRepository for HttpRideRepository {
    #[tracing::instrument(skip(self))]
    async fn fetch_profile(&self, driver_id: &str) -> TrackerResult<DriverProfile> {
        self.get(&["drivers", driver_id, "profile"], &[]).await
    }

    #[tracing::instrument(skip(self, profile), fields(driver_id = %profile.id))]
    async fn save_profile(&self, profile: &DriverProfile) -> TrackerResult<DriverProfile> {
        self.send(Method::PUT, &["drivers", profile.id.as_str(), "profile"], profile)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_rides(&self, driver_id: &str, status: RideStatus) -> TrackerResult<Vec<Ride>> {
        self.get(&["drivers", driver_id, "rides"], &[("status", status.as_str())])
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_ride(&self, ride_id: &str) -> TrackerResult<Ride> {
        self.get(&["rides", ride_id], &[]).await
    }

    #[tracing::instrument(skip(self, ride))]
    async fn create_ride(&self, driver_id: &str, ride: NewRide) -> TrackerResult<Ride> {
        self.send(Method::POST, &["drivers", driver_id, "rides"], &ride)
            .await
    }

    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id, status = %ride.status))]
    async fn save_ride(&self, ride: &Ride) -> TrackerResult<Ride> {
        self.send(Method::PUT, &["rides", ride.id.as_str()], ride).await
    }

    #[tracing::instrument(skip(self, record), fields(ride_id = %record.ride.id))]
    async fn record_cancellation(&self, record: &CancelledRide) -> TrackerResult<CancelledRide> {
        self.send(Method::POST, &["rides", record.ride.id.as_str(), "cancellation"], record)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_cancellations(&self, driver_id: &str) -> TrackerResult<Vec<CancelledRide>> {
        self.get(&["drivers", driver_id, "cancellations"], &[])
            .await
    }
}
