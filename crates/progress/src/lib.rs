//! BrightPath points service.
//!
//! Composes the pure domain logic in `brightpath_core` with the Postgres
//! repositories in `brightpath_db` into the operations the rest of the
//! platform calls: lazy initialization, activity updates, totals, reset,
//! leaderboards and audits.

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::ProgressConfig;
pub use error::{ProgressError, ProgressResult};
pub use service::PointsService;
