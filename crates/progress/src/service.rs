//! Points and progress operations.
//!
//! Every write recomputes the whole document's aggregates and persists it
//! with a version check. See [`PointsService::apply_activity_update`] for
//! how concurrent writers and resets are resolved.

use std::sync::Arc;

use brightpath_core::curriculum;
use brightpath_core::error::CoreError;
use brightpath_core::points::{self, ProgressSummary};
use brightpath_core::progress::{instantiate_progress, ProgressData, UserProgress};
use brightpath_core::scoring::{self, ActivityPatch};
use brightpath_core::types::DbId;
use brightpath_db::models::user_points::{CreateUserPoints, LeaderboardEntry};
use brightpath_db::repositories::user_points_repo::UQ_USER_ID;
use brightpath_db::repositories::UserPointsRepo;
use brightpath_db::DbPool;
use serde::Serialize;

use crate::config::ProgressConfig;
use crate::error::{ProgressError, ProgressResult};

/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Records fetched per page while auditing.
const AUDIT_PAGE_SIZE: i64 = 100;

/// Result of an [`PointsService::audit`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub scanned: usize,
    /// Users whose stored aggregates disagreed with a full recompute.
    pub repaired: Vec<DbId>,
    /// Users whose stored document could not be decoded.
    pub corrupt: Vec<DbId>,
}

/// Entry point for all points-related operations.
///
/// Cheaply cloneable; the pool is reference-counted internally.
#[derive(Clone)]
pub struct PointsService {
    pool: DbPool,
    config: Arc<ProgressConfig>,
}

impl PointsService {
    pub fn new(pool: DbPool, config: ProgressConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    // -----------------------------------------------------------------------
    // Progress store
    // -----------------------------------------------------------------------

    /// Fetch the user's record, creating a fresh one on first access.
    ///
    /// A concurrent first access that loses the insert race re-reads the
    /// winner's record instead of failing.
    pub async fn get_or_create(&self, user_id: DbId) -> ProgressResult<UserProgress> {
        for _ in 0..=self.config.update_max_retries {
            if let Some(row) = UserPointsRepo::find_by_user_id(&self.pool, user_id).await? {
                return Ok(row.into_progress()?);
            }

            let input = CreateUserPoints {
                user_id,
                total_points: 0,
                progress_data: instantiate_progress().to_json()?,
            };
            match UserPointsRepo::create(&self.pool, &input).await {
                Ok(row) => {
                    tracing::info!(user_id, "Initialized progress record");
                    return Ok(row.into_progress()?);
                }
                Err(err) if brightpath_db::is_unique_violation(&err, UQ_USER_ID) => {
                    tracing::debug!(user_id, "Lost initialization race, re-reading record");
                }
                Err(err) => {
                    tracing::error!(user_id, error = %err, "Failed to initialize progress record");
                    return Err(err.into());
                }
            }
        }

        Err(CoreError::Internal(format!(
            "Progress record for user {user_id} kept disappearing during initialization"
        ))
        .into())
    }

    /// Replace the user's whole progress document.
    ///
    /// Derived fields in `progress_data` (`earned`, completion flags, point
    /// aggregates) are ignored and recomputed from the activity state before
    /// the total is taken. The record must exist.
    pub async fn replace(
        &self,
        user_id: DbId,
        progress_data: &ProgressData,
    ) -> ProgressResult<UserProgress> {
        progress_data.check_bounds().map_err(CoreError::Validation)?;

        let mut data = progress_data.clone();
        scoring::recompute_all(&mut data);
        let total = points::compute_total(&data);
        let json = data.to_json()?;

        let row = UserPointsRepo::replace(&self.pool, user_id, &json, total)
            .await?
            .ok_or_else(|| ProgressError::record_not_found(user_id))?;

        tracing::info!(user_id, total_points = total, "Progress document replaced");
        Ok(row.into_progress()?)
    }

    /// Cached total for a user. Fails with `NotFound` if the user has no record.
    pub async fn get_total(&self, user_id: DbId) -> ProgressResult<i64> {
        UserPointsRepo::total_points(&self.pool, user_id)
            .await?
            .ok_or_else(|| ProgressError::record_not_found(user_id))
    }

    /// Full record for a user. Fails with `NotFound` if the user has no record.
    pub async fn progress(&self, user_id: DbId) -> ProgressResult<UserProgress> {
        let row = UserPointsRepo::find_by_user_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ProgressError::record_not_found(user_id))?;
        Ok(row.into_progress()?)
    }

    /// Delete the user's record (if any) and start over from a fresh copy.
    pub async fn reset(&self, user_id: DbId) -> ProgressResult<UserProgress> {
        let deleted = UserPointsRepo::delete_by_user_id(&self.pool, user_id).await?;
        tracing::info!(user_id, deleted, "Progress reset");
        self.get_or_create(user_id).await
    }

    // -----------------------------------------------------------------------
    // Activity updates
    // -----------------------------------------------------------------------

    /// Merge one activity's progress into the user's document and persist it.
    ///
    /// Writes are stamped with the record's `(id, version)`. When the stamp
    /// no longer matches:
    /// - the same record was updated concurrently: reload and retry, up to
    ///   `update_max_retries` times, then fail with `Conflict`;
    /// - the record was reset (different id, or gone): the update belonged
    ///   to the old record and is rejected with `Conflict`.
    pub async fn apply_activity_update(
        &self,
        user_id: DbId,
        course_id: &str,
        lesson_id: &str,
        activity_key: &str,
        patch: &ActivityPatch,
    ) -> ProgressResult<UserProgress> {
        curriculum::template().require_activity(course_id, lesson_id, activity_key)?;

        let mut record = self.get_or_create(user_id).await?;
        let mut retries = 0;

        loop {
            let mut data = record.progress_data.clone();
            let outcome = scoring::apply_activity_update(
                &mut data,
                course_id,
                lesson_id,
                activity_key,
                patch,
            )?;
            let total = points::compute_total(&data);
            let json = data.to_json()?;

            if let Some(row) = UserPointsRepo::replace_if_current(
                &self.pool,
                record.id,
                record.version,
                &json,
                total,
            )
            .await?
            {
                tracing::info!(
                    user_id,
                    course_id = %course_id,
                    lesson_id = %lesson_id,
                    activity = %activity_key,
                    earned = outcome.earned,
                    lesson_completed = outcome.lesson_completed,
                    total_points = total,
                    "Activity progress updated",
                );
                return Ok(row.into_progress()?);
            }

            match UserPointsRepo::find_by_user_id(&self.pool, user_id).await? {
                Some(current) if current.id == record.id => {
                    retries += 1;
                    if retries > self.config.update_max_retries {
                        tracing::warn!(user_id, retries, "Giving up on contended progress update");
                        return Err(CoreError::Conflict(format!(
                            "Progress for user {user_id} is being updated concurrently"
                        ))
                        .into());
                    }
                    tracing::debug!(user_id, retries, "Concurrent progress write, retrying");
                    record = current.into_progress()?;
                }
                _ => {
                    tracing::warn!(
                        user_id,
                        course_id = %course_id,
                        lesson_id = %lesson_id,
                        activity = %activity_key,
                        "Progress was reset during update, rejecting stale write",
                    );
                    return Err(CoreError::Conflict(format!(
                        "Progress for user {user_id} was reset while the update was in flight"
                    ))
                    .into());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dashboard reads
    // -----------------------------------------------------------------------

    /// Like [`Self::get_total`], reporting a missing record as zero.
    pub async fn total_or_zero(&self, user_id: DbId) -> ProgressResult<i64> {
        match self.get_total(user_id).await {
            Err(err) if err.is_not_found() => Ok(0),
            other => other,
        }
    }

    /// The user's document, or a fresh zeroed one if they have no record.
    ///
    /// Never creates a record.
    pub async fn progress_or_default(&self, user_id: DbId) -> ProgressResult<ProgressData> {
        match self.progress(user_id).await {
            Ok(record) => Ok(record.progress_data),
            Err(err) if err.is_not_found() => Ok(instantiate_progress()),
            Err(err) => Err(err),
        }
    }

    /// Per-course dashboard figures for a user.
    pub async fn summary(&self, user_id: DbId) -> ProgressResult<ProgressSummary> {
        let data = self.progress_or_default(user_id).await?;
        Ok(points::summarize(&data))
    }

    /// Top users by total points.
    pub async fn leaderboard(&self, limit: Option<i64>) -> ProgressResult<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(self.config.leaderboard_default_limit);
        if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
            return Err(CoreError::Validation(format!(
                "Leaderboard limit must be between 1 and {MAX_LEADERBOARD_LIMIT}, got {limit}"
            ))
            .into());
        }
        Ok(UserPointsRepo::leaderboard(&self.pool, limit).await?)
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Recompute every stored document from scratch and repair drift.
    ///
    /// Records that change concurrently are skipped; their own write already
    /// recomputed them.
    pub async fn audit(&self) -> ProgressResult<AuditReport> {
        let mut report = AuditReport::default();
        let mut after_id = 0;

        loop {
            let page = UserPointsRepo::list_after(&self.pool, after_id, AUDIT_PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;

            for row in page {
                report.scanned += 1;
                let user_id = row.user_id;

                let record = match row.into_progress() {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::error!(user_id, error = %err, "Undecodable progress document");
                        report.corrupt.push(user_id);
                        continue;
                    }
                };

                let mut data = record.progress_data.clone();
                scoring::recompute_all(&mut data);
                let total = points::compute_total(&data);
                if data == record.progress_data && total == record.total_points {
                    continue;
                }

                tracing::warn!(
                    user_id,
                    stored_total = record.total_points,
                    recomputed_total = total,
                    "Progress aggregates drifted, repairing",
                );
                let repaired = UserPointsRepo::replace_if_current(
                    &self.pool,
                    record.id,
                    record.version,
                    &data.to_json()?,
                    total,
                )
                .await?;
                if repaired.is_some() {
                    report.repaired.push(user_id);
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            repaired = report.repaired.len(),
            corrupt = report.corrupt.len(),
            "Progress audit finished",
        );
        Ok(report)
    }
}
