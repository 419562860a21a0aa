//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod user_points_repo;

pub use user_points_repo::UserPointsRepo;
