// src/services/mod.rs
pub mod http_repository;
pub mod location_service;
pub mod memory_repository;
pub mod redis_repository;
pub mod repository;
pub mod ride_service;
pub mod ride_store;
pub mod stats_service;
