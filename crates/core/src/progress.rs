//! Per-user progress documents.
//!
//! A progress document mirrors the shape of the curriculum catalogue with
//! live completion state on every course, lesson and activity node. Fresh
//! documents are instantiated from [`crate::curriculum::template`] and own
//! all of their data, so no two users ever share a node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curriculum::{self, ActivityTemplate, ActivityType, CurriculumTemplate};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Sync bookkeeping
// ---------------------------------------------------------------------------

pub const SYNC_STATUS_INITIAL: &str = "initial";
pub const SYNC_STATUS_SYNCED: &str = "synced";

/// All valid sync status strings.
pub const VALID_SYNC_STATUSES: &[&str] = &[SYNC_STATUS_INITIAL, SYNC_STATUS_SYNCED];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Freshly instantiated, never written by an update.
    Initial,
    Synced,
}

impl SyncStatus {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            SYNC_STATUS_INITIAL => Ok(Self::Initial),
            SYNC_STATUS_SYNCED => Ok(Self::Synced),
            _ => Err(format!(
                "Invalid sync status '{s}'. Must be one of: {}",
                VALID_SYNC_STATUSES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => SYNC_STATUS_INITIAL,
            Self::Synced => SYNC_STATUS_SYNCED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    pub last_synced_at: Option<Timestamp>,
    pub sync_status: SyncStatus,
}

// ---------------------------------------------------------------------------
// Document nodes
// ---------------------------------------------------------------------------

/// Largest `points` or `extraPoints` a stored activity may carry.
pub const MAX_ACTIVITY_POINTS: i64 = 1_000;
/// Largest `questionsCount` a stored quiz may carry.
pub const MAX_QUESTIONS_COUNT: i64 = 1_000;

/// Live state of one activity.
///
/// Carries the template's point rules alongside the type-specific progress
/// fields: `percentWatched` for videos, `correctAnswers`/`percentCorrect`
/// for quizzes. Worksheets only track `completed` and `earned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityProgress {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_count: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub earned: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_watched: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_correct: Option<i64>,
}

impl ActivityProgress {
    /// Zeroed progress for a catalogue activity.
    pub fn from_template(template: &ActivityTemplate) -> Self {
        let (percent_watched, percent_correct) = match template.activity_type {
            ActivityType::Video => (Some(0), None),
            ActivityType::Worksheet => (None, None),
            ActivityType::Quiz => (None, Some(0)),
        };

        Self {
            activity_type: template.activity_type,
            title: template.title.clone(),
            points: template.points,
            extra_points: template.extra_points,
            questions_count: template.questions_count,
            completed: false,
            earned: 0,
            percent_watched,
            correct_answers: None,
            percent_correct,
        }
    }

    /// Highest number of points this activity can ever award.
    pub fn max_points(&self) -> i64 {
        self.points + self.extra_points.unwrap_or(0)
    }

    /// Check that point rules and live fields are within their legal ranges.
    pub fn check_bounds(&self) -> Result<(), String> {
        let in_range = |field: &str, value: i64, max: i64| -> Result<(), String> {
            if (0..=max).contains(&value) {
                Ok(())
            } else {
                Err(format!("{field} must be between 0 and {max}, got {value}"))
            }
        };

        in_range("points", self.points, MAX_ACTIVITY_POINTS)?;
        if let Some(extra) = self.extra_points {
            in_range("extraPoints", extra, MAX_ACTIVITY_POINTS)?;
        }
        let questions = self.questions_count.unwrap_or(0);
        in_range("questionsCount", questions, MAX_QUESTIONS_COUNT)?;
        if let Some(percent) = self.percent_watched {
            in_range("percentWatched", percent, 100)?;
        }
        if let Some(correct) = self.correct_answers {
            in_range("correctAnswers", correct, questions)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub lesson_points: i64,
    pub activities: BTreeMap<String, ActivityProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub course_points: i64,
    pub lessons: BTreeMap<String, LessonProgress>,
}

/// The nested course -> lesson -> activity tree stored per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressData {
    pub courses: BTreeMap<String, CourseProgress>,
}

impl ProgressData {
    /// Build a zeroed document with the same shape as `template`.
    pub fn from_template(template: &CurriculumTemplate) -> Self {
        let courses = template
            .courses
            .iter()
            .map(|(course_id, course)| {
                let lessons = course
                    .lessons
                    .iter()
                    .map(|(lesson_id, lesson)| {
                        let activities = lesson
                            .activities
                            .iter()
                            .map(|(key, activity)| {
                                (key.clone(), ActivityProgress::from_template(activity))
                            })
                            .collect();
                        (
                            lesson_id.clone(),
                            LessonProgress {
                                title: lesson.title.clone(),
                                completed: false,
                                lesson_points: 0,
                                activities,
                            },
                        )
                    })
                    .collect();
                (
                    course_id.clone(),
                    CourseProgress {
                        title: course.title.clone(),
                        completed: false,
                        course_points: 0,
                        lessons,
                    },
                )
            })
            .collect();

        Self { courses }
    }

    pub fn activity(
        &self,
        course_id: &str,
        lesson_id: &str,
        activity_key: &str,
    ) -> Option<&ActivityProgress> {
        self.courses
            .get(course_id)?
            .lessons
            .get(lesson_id)?
            .activities
            .get(activity_key)
    }

    pub fn lesson(&self, course_id: &str, lesson_id: &str) -> Option<&LessonProgress> {
        self.courses.get(course_id)?.lessons.get(lesson_id)
    }

    /// Encode for storage in a JSONB column.
    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self)
            .map_err(|e| CoreError::Internal(format!("Failed to encode progress document: {e}")))
    }

    /// Check every activity node with [`ActivityProgress::check_bounds`].
    ///
    /// The error names the offending address.
    pub fn check_bounds(&self) -> Result<(), String> {
        for (course_id, course) in &self.courses {
            for (lesson_id, lesson) in &course.lessons {
                for (key, activity) in &lesson.activities {
                    activity
                        .check_bounds()
                        .map_err(|e| format!("{course_id}/{lesson_id}/{key}: {e}"))?;
                }
            }
        }
        Ok(())
    }

    /// Decode a stored JSONB document.
    ///
    /// Documents whose activity fields are out of range are rejected as
    /// corrupt, so recomputing them can never overflow.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        let data: Self = serde_json::from_value(value)
            .map_err(|e| CoreError::Internal(format!("Corrupt progress document: {e}")))?;
        data.check_bounds()
            .map_err(|e| CoreError::Internal(format!("Corrupt progress document: {e}")))?;
        Ok(data)
    }
}

/// Fresh, independently owned progress document for a new user.
pub fn instantiate_progress() -> ProgressData {
    ProgressData::from_template(curriculum::template())
}

// ---------------------------------------------------------------------------
// User progress record
// ---------------------------------------------------------------------------

/// Domain view of a stored progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: DbId,
    pub user_id: DbId,
    pub total_points: i64,
    pub progress_data: ProgressData,
    pub sync_info: SyncInfo,
    pub last_synced: Option<Timestamp>,
    /// Optimistic-concurrency stamp, bumped on every write.
    #[serde(skip)]
    pub version: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
