use std::sync::Arc;

use schoolbus_driver::{
    config::AppConfig,
    handlers,
    services::{
        http_repository::HttpRideRepository,
        ride_service::{RideOperations, RideService},
    },
    state::AppState,
    utils::{
        format::{format_date_time, format_distance, format_duration, round_to},
        geo::{default_location, SHEIKH_ZAYED_BOUNDS},
    },
    TrackerError, TrackerResult,
};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt().with_max_level(config.log_level).init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    let result = match command.as_str() {
        "serve" => serve(config).await,
        "session" => session(config).await,
        other => Err(TrackerError::bad_request(format!(
            "unknown command {}, expected serve or session",
            other
        ))),
    };

    if let Err(err) = result {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

/// Runs the ride backend.
async fn serve(config: AppConfig) -> TrackerResult<()> {
    let addr = config.bind_addr;
    let app = handlers::router(Arc::new(AppState::new(config).await?));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TrackerError::ServiceUnavailable(format!("cannot bind {}: {}", addr, e)))?;

    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| TrackerError::internal_error(e.to_string()))
}

/// Loads the configured driver's session from the backend and prints a
/// summary of it.
async fn session(config: AppConfig) -> TrackerResult<()> {
    let repository = Arc::new(HttpRideRepository::new(config.api.clone())?);
    let service = RideService::load(&config.driver_id, repository, config.location).await?;

    let store = service.snapshot().await;
    let stats = service.stats().await;
    let profile = store.profile();
    let position = store.current_location().cloned().unwrap_or_else(default_location);

    tracing::info!(
        "{} ({}) at {}, {}",
        profile.name,
        profile.vehicle_info.plate,
        position.latitude,
        position.longitude
    );

    if let Some(ride) = store.active() {
        tracing::info!("In progress: {} since {}", ride.id, format_date_time(&ride.start_time));
    }

    for ride in store.upcoming() {
        let (pickups, _) = SHEIKH_ZAYED_BOUNDS.validate_ride_locations(&ride.pickup_points, &ride.destination_location);
        let outside = pickups
            .iter()
            .zip(&ride.pickup_points)
            .filter(|(clamped, reported)| clamped != reported)
            .count();
        if outside > 0 {
            tracing::warn!("{}: {} pickup points outside the service area", ride.id, outside);
        }

        tracing::info!(
            "Upcoming: {} at {}, {} students, {} / {}",
            ride.id,
            format_date_time(&ride.start_time),
            ride.student_ids.len(),
            format_distance(ride.total_distance),
            format_duration(ride.total_duration)
        );
    }

    tracing::info!(
        "{} rides, {}% completed, {} driven in {} h, rated {}",
        stats.total_rides,
        stats.completion_rate(),
        format_distance(stats.total_km_driven),
        round_to(stats.total_hours_driven, 1),
        stats.average_rating
    );

    Ok(())
}
