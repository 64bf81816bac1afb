// src/utils/mod.rs
pub mod format;
pub mod geo;
pub mod id_generator;
pub mod mock_data;
