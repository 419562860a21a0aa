#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for an unknown course/lesson/activity address.
    pub fn activity_not_found(course_id: &str, lesson_id: &str, activity_key: &str) -> Self {
        Self::NotFound {
            entity: "activity",
            id: format!("{course_id}/{lesson_id}/{activity_key}"),
        }
    }
}
