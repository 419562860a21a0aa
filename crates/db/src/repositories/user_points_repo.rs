//! Repository for the `user_points` table.

use brightpath_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_points::{CreateUserPoints, LeaderboardEntry, UserPoints};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, total_points, progress_data, sync_status, \
                       last_synced_at, version, created_at, updated_at";

/// Name of the one-record-per-user constraint.
pub const UQ_USER_ID: &str = "uq_user_points_user_id";

/// Provides persistence for per-user progress documents.
pub struct UserPointsRepo;

impl UserPointsRepo {
    /// Insert a fresh record with `sync_status = 'initial'`.
    ///
    /// Fails with a unique violation on [`UQ_USER_ID`] if the user already
    /// has a record.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUserPoints,
    ) -> Result<UserPoints, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_points (user_id, total_points, progress_data)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPoints>(&query)
            .bind(input.user_id)
            .bind(input.total_points)
            .bind(&input.progress_data)
            .fetch_one(pool)
            .await
    }

    /// Find the record belonging to a user.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserPoints>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_points WHERE user_id = $1");
        sqlx::query_as::<_, UserPoints>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the whole progress document of a user unconditionally.
    ///
    /// Marks the record synced and bumps `version`. Returns `None` if the
    /// user has no record.
    pub async fn replace(
        pool: &PgPool,
        user_id: DbId,
        progress_data: &serde_json::Value,
        total_points: i64,
    ) -> Result<Option<UserPoints>, sqlx::Error> {
        let query = format!(
            "UPDATE user_points SET
                 progress_data = $2,
                 total_points = $3,
                 sync_status = 'synced',
                 last_synced_at = NOW(),
                 version = version + 1
             WHERE user_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPoints>(&query)
            .bind(user_id)
            .bind(progress_data)
            .bind(total_points)
            .fetch_optional(pool)
            .await
    }

    /// Replace the document only if the record still has the given `id` and
    /// `version`.
    ///
    /// Returns `None` when another write (or a reset) got there first.
    pub async fn replace_if_current(
        pool: &PgPool,
        id: DbId,
        version: i64,
        progress_data: &serde_json::Value,
        total_points: i64,
    ) -> Result<Option<UserPoints>, sqlx::Error> {
        let query = format!(
            "UPDATE user_points SET
                 progress_data = $3,
                 total_points = $4,
                 sync_status = 'synced',
                 last_synced_at = NOW(),
                 version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPoints>(&query)
            .bind(id)
            .bind(version)
            .bind(progress_data)
            .bind(total_points)
            .fetch_optional(pool)
            .await
    }

    /// Cached total for a user, `None` if the user has no record.
    pub async fn total_points(pool: &PgPool, user_id: DbId) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT total_points FROM user_points WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a user's record. Returns `true` if a row was removed.
    pub async fn delete_by_user_id(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_points WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Top users by total points. Ties are broken by ascending user id.
    pub async fn leaderboard(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT user_id, total_points FROM user_points
             ORDER BY total_points DESC, user_id ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Page through all records in id order, starting after `after_id`.
    pub async fn list_after(
        pool: &PgPool,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<UserPoints>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_points
             WHERE id > $1
             ORDER BY id
             LIMIT $2"
        );
        sqlx::query_as::<_, UserPoints>(&query)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
