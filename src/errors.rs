use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ride::RideStatus;

/// Main error type for the driver ride tracker
#[derive(Debug)]
pub enum TrackerError {
    // HTTP and API errors
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServer(String),
    ServiceUnavailable(String),

    // Ride lifecycle errors
    RideNotFound(String),
    DriverNotFound(String),
    InvalidTransition {
        ride_id: String,
        from: RideStatus,
        to: RideStatus,
    },
    RideAlreadyActive {
        active_ride_id: String,
        requested_ride_id: String,
    },
    DuplicateRide(String),

    // Redis errors
    RedisConnection(String),
    RedisQuery(String),

    // Network and HTTP client errors
    NetworkTimeout,
    NetworkConnection(String),
    HttpClient(String),
    UpstreamStatus { status: u16, message: String },
    InvalidUrl(String),

    // Serialization and parsing errors
    JsonParsing(String),
    JsonSerialization(String),
    InvalidFormat(String),

    // Validation errors
    ValidationFailed(Vec<ValidationError>),

    // Configuration errors
    MissingEnvironmentVariable(String),
    InvalidConfiguration(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Body of every error response the backend sends.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            TrackerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            TrackerError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            TrackerError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),
            TrackerError::ServiceUnavailable(service) => write!(f, "Service unavailable: {}", service),

            TrackerError::RideNotFound(id) => write!(f, "Ride not found: {}", id),
            TrackerError::DriverNotFound(id) => write!(f, "Driver not found: {}", id),
            TrackerError::InvalidTransition { ride_id, from, to } => {
                write!(f, "Invalid transition for ride {}: {} -> {}", ride_id, from, to)
            }
            TrackerError::RideAlreadyActive { active_ride_id, requested_ride_id } => write!(
                f,
                "Cannot start ride {}: ride {} is already in progress",
                requested_ride_id, active_ride_id
            ),
            TrackerError::DuplicateRide(id) => write!(f, "Ride appears more than once: {}", id),

            TrackerError::RedisConnection(msg) => write!(f, "Redis connection error: {}", msg),
            TrackerError::RedisQuery(msg) => write!(f, "Redis query error: {}", msg),

            TrackerError::NetworkTimeout => write!(f, "Network request timed out"),
            TrackerError::NetworkConnection(msg) => write!(f, "Network connection error: {}", msg),
            TrackerError::HttpClient(msg) => write!(f, "HTTP client error: {}", msg),
            TrackerError::UpstreamStatus { status, message } => {
                write!(f, "Backend responded with {}: {}", status, message)
            }
            TrackerError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),

            TrackerError::JsonParsing(msg) => write!(f, "JSON parsing error: {}", msg),
            TrackerError::JsonSerialization(msg) => write!(f, "JSON serialization error: {}", msg),
            TrackerError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),

            TrackerError::ValidationFailed(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }

            TrackerError::MissingEnvironmentVariable(var) => {
                write!(f, "Missing environment variable: {}", var)
            }
            TrackerError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            TrackerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            TrackerError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            TrackerError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),

            TrackerError::ValidationFailed(errors) => {
                let details = serde_json::to_value(&errors).ok();
                (StatusCode::BAD_REQUEST, "validation_failed", "Validation errors occurred".to_string(), details)
            }
            TrackerError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "invalid_format", msg, None),

            TrackerError::RideNotFound(id) => (StatusCode::NOT_FOUND, "ride_not_found", id, None),
            TrackerError::DriverNotFound(id) => (StatusCode::NOT_FOUND, "driver_not_found", id, None),

            err @ TrackerError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "invalid_transition", err.to_string(), None)
            }
            err @ TrackerError::RideAlreadyActive { .. } => {
                (StatusCode::CONFLICT, "ride_already_active", err.to_string(), None)
            }
            TrackerError::DuplicateRide(id) => (StatusCode::CONFLICT, "duplicate_ride", id, None),

            TrackerError::ServiceUnavailable(service) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", format!("Service unavailable: {}", service), None)
            }

            // All other errors are treated as internal server errors
            other => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string(), None),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type TrackerResult<T> = Result<T, TrackerError>;

impl From<redis::RedisError> for TrackerError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => TrackerError::RedisConnection(err.to_string()),
            redis::ErrorKind::AuthenticationFailed => TrackerError::RedisConnection("Authentication failed".to_string()),
            _ => TrackerError::RedisQuery(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TrackerError::NetworkTimeout
        } else if err.is_connect() {
            TrackerError::NetworkConnection(err.to_string())
        } else if err.is_decode() {
            TrackerError::JsonParsing(err.to_string())
        } else {
            TrackerError::HttpClient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            TrackerError::JsonParsing(err.to_string())
        } else {
            TrackerError::JsonSerialization(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for TrackerError {
    fn from(err: chrono::ParseError) -> Self {
        TrackerError::InvalidFormat(format!("Invalid date/time format: {}", err))
    }
}

// Helper functions for creating common errors
impl TrackerError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        TrackerError::BadRequest(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        TrackerError::NotFound(resource.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        TrackerError::InternalServer(msg.into())
    }

    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        TrackerError::ValidationFailed(vec![ValidationError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn ride_not_found(ride_id: impl Into<String>) -> Self {
        TrackerError::RideNotFound(ride_id.into())
    }

    pub fn driver_not_found(driver_id: impl Into<String>) -> Self {
        TrackerError::DriverNotFound(driver_id.into())
    }

    /// Rebuilds a typed error from a backend error body.
    pub fn from_response(status: u16, body: ErrorResponse) -> Self {
        match body.error.as_str() {
            "ride_not_found" => TrackerError::RideNotFound(body.message),
            "driver_not_found" => TrackerError::DriverNotFound(body.message),
            "validation_failed" => {
                let errors = body
                    .details
                    .and_then(|details| serde_json::from_value(details).ok())
                    .unwrap_or_default();
                TrackerError::ValidationFailed(errors)
            }
            "bad_request" | "invalid_format" => TrackerError::BadRequest(body.message),
            "not_found" => TrackerError::NotFound(body.message),
            "conflict" | "invalid_transition" | "ride_already_active" | "duplicate_ride" => {
                TrackerError::Conflict(body.message)
            }
            "service_unavailable" => TrackerError::ServiceUnavailable(body.message),
            _ => TrackerError::UpstreamStatus { status, message: body.message },
        }
    }
}
