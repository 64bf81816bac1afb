// src/models/mod.rs
pub mod driver;
pub mod ride;
pub mod stats;

pub use driver::*;
pub use ride::*;
pub use stats::*;
