pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use errors::{TrackerError, TrackerResult, ValidationError};
pub use services::ride_store::RideLifecycleStore;
