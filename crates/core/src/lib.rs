//! Domain logic for BrightPath points and progress tracking.
//!
//! This crate has no database dependencies. Everything here operates on
//! in-memory progress documents handed in by the persistence layer.

pub mod curriculum;
pub mod error;
pub mod points;
pub mod progress;
pub mod scoring;
pub mod types;
