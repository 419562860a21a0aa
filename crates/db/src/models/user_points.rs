//! User points entity models and DTOs.

use brightpath_core::error::CoreError;
use brightpath_core::progress::{ProgressData, SyncInfo, SyncStatus, UserProgress};
use brightpath_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_points` table.
///
/// `progress_data` holds the JSONB progress document; use
/// [`UserPoints::into_progress`] to decode it into the domain view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPoints {
    pub id: DbId,
    pub user_id: DbId,
    pub total_points: i64,
    pub progress_data: serde_json::Value,
    pub sync_status: String,
    pub last_synced_at: Option<Timestamp>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserPoints {
    /// Decode the row into a [`UserProgress`].
    pub fn into_progress(self) -> Result<UserProgress, CoreError> {
        let sync_status =
            SyncStatus::from_str_value(&self.sync_status).map_err(CoreError::Internal)?;
        let progress_data = ProgressData::from_json(self.progress_data)?;

        Ok(UserProgress {
            id: self.id,
            user_id: self.user_id,
            total_points: self.total_points,
            progress_data,
            sync_info: SyncInfo {
                last_synced_at: self.last_synced_at,
                sync_status,
            },
            last_synced: self.last_synced_at,
            version: self.version,
        })
    }
}

/// DTO for inserting a fresh progress record.
#[derive(Debug, Clone)]
pub struct CreateUserPoints {
    pub user_id: DbId,
    pub total_points: i64,
    pub progress_data: serde_json::Value,
}

/// One row of the points leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: DbId,
    pub total_points: i64,
}
