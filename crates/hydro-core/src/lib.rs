pub mod active;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod control;
pub mod directory;
pub mod engine;
pub mod error;
pub mod groupings;
pub mod links;
pub mod model;
pub mod reconcile;
pub mod saga;
pub mod tracker;
pub mod withdrawal;
pub mod workflow;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use config::{HydroConfig, TrackerConfig, Vocabulary};
pub use engine::Engine;
pub use error::{HydroError, Result, TrackerError, TrackerResult};
pub use tracker::Tracker;
