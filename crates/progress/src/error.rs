use brightpath_core::error::CoreError;
use brightpath_core::types::DbId;

/// Error type for points service operations.
///
/// Wraps [`CoreError`] for domain errors and adds the storage failure case.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// A domain-level error from `brightpath_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database failed or was unreachable.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Convenience type alias for service return values.
pub type ProgressResult<T> = Result<T, ProgressError>;

impl ProgressError {
    /// No progress record exists for `user_id`.
    pub(crate) fn record_not_found(user_id: DbId) -> Self {
        Self::Core(CoreError::NotFound {
            entity: "user_points",
            id: user_id.to_string(),
        })
    }

    /// Stable machine-readable code for the surrounding application.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Core(CoreError::NotFound { .. }) => "NOT_FOUND",
            Self::Core(CoreError::Validation(_)) => "VALIDATION_ERROR",
            Self::Core(CoreError::Conflict(_)) => "CONFLICT",
            Self::Core(CoreError::Internal(_)) => "INTERNAL_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Read paths treat a missing record as zero progress.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }
}
