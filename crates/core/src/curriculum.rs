//! Static curriculum catalogue.
//!
//! Describes every course, lesson and activity a student can earn points
//! for. The catalogue is built once per process and never mutated; per-user
//! progress documents are instantiated from it in [`crate::progress`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const ACTIVITY_VIDEO: &str = "video";
pub const ACTIVITY_WORKSHEET: &str = "worksheet";
pub const ACTIVITY_QUIZ: &str = "quiz";

/// Base points for watching a lesson video to the end.
pub const VIDEO_POINTS: i64 = 7;
/// Points for a completed worksheet.
pub const WORKSHEET_POINTS: i64 = 5;
/// Base points for a quiz, prorated by percent correct.
pub const QUIZ_POINTS: i64 = 5;
/// Bonus for a perfect quiz score.
pub const QUIZ_PERFECT_BONUS: i64 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Kind of trackable activity inside a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Video,
    Worksheet,
    Quiz,
}

impl ActivityType {
    /// The activity key this type is stored under in a lesson.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => ACTIVITY_VIDEO,
            Self::Worksheet => ACTIVITY_WORKSHEET,
            Self::Quiz => ACTIVITY_QUIZ,
        }
    }
}

/// Definition of a single activity and its point rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTemplate {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub points: i64,
    /// Bonus awarded only on a perfect quiz score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonTemplate {
    pub title: String,
    pub activities: BTreeMap<String, ActivityTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseTemplate {
    pub title: String,
    pub lessons: BTreeMap<String, LessonTemplate>,
}

/// The full catalogue, keyed by course id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurriculumTemplate {
    pub courses: BTreeMap<String, CourseTemplate>,
}

impl CurriculumTemplate {
    /// Look up an activity by its course/lesson/activity address.
    pub fn activity(
        &self,
        course_id: &str,
        lesson_id: &str,
        activity_key: &str,
    ) -> Option<&ActivityTemplate> {
        self.courses
            .get(course_id)?
            .lessons
            .get(lesson_id)?
            .activities
            .get(activity_key)
    }

    /// Like [`Self::activity`], failing with `NotFound` for unknown addresses.
    pub fn require_activity(
        &self,
        course_id: &str,
        lesson_id: &str,
        activity_key: &str,
    ) -> Result<&ActivityTemplate, CoreError> {
        self.activity(course_id, lesson_id, activity_key)
            .ok_or_else(|| CoreError::activity_not_found(course_id, lesson_id, activity_key))
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

static CURRICULUM: LazyLock<CurriculumTemplate> = LazyLock::new(build_curriculum);

/// The process-wide curriculum catalogue.
pub fn template() -> &'static CurriculumTemplate {
    &CURRICULUM
}

fn video() -> (String, ActivityTemplate) {
    (
        ACTIVITY_VIDEO.to_string(),
        ActivityTemplate {
            activity_type: ActivityType::Video,
            title: None,
            points: VIDEO_POINTS,
            extra_points: None,
            questions_count: None,
        },
    )
}

fn worksheet(title: &str) -> (String, ActivityTemplate) {
    (
        ACTIVITY_WORKSHEET.to_string(),
        ActivityTemplate {
            activity_type: ActivityType::Worksheet,
            title: Some(title.to_string()),
            points: WORKSHEET_POINTS,
            extra_points: None,
            questions_count: None,
        },
    )
}

fn quiz(title: &str, questions_count: i64) -> (String, ActivityTemplate) {
    (
        ACTIVITY_QUIZ.to_string(),
        ActivityTemplate {
            activity_type: ActivityType::Quiz,
            title: Some(title.to_string()),
            points: QUIZ_POINTS,
            extra_points: Some(QUIZ_PERFECT_BONUS),
            questions_count: Some(questions_count),
        },
    )
}

fn lesson(
    id: &str,
    title: &str,
    activities: Vec<(String, ActivityTemplate)>,
) -> (String, LessonTemplate) {
    (
        id.to_string(),
        LessonTemplate {
            title: title.to_string(),
            activities: activities.into_iter().collect(),
        },
    )
}

fn course(
    id: &str,
    title: &str,
    lessons: Vec<(String, LessonTemplate)>,
) -> (String, CourseTemplate) {
    (
        id.to_string(),
        CourseTemplate {
            title: title.to_string(),
            lessons: lessons.into_iter().collect(),
        },
    )
}

fn build_curriculum() -> CurriculumTemplate {
    let courses = vec![
        course(
            "astronomy",
            "Exploring Space",
            vec![
                lesson(
                    "lesson1",
                    "The Sun and Stars",
                    vec![
                        video(),
                        worksheet("Star Facts Worksheet"),
                        quiz("Sun and Stars Quiz", 14),
                    ],
                ),
                lesson(
                    "lesson2",
                    "Our Solar System",
                    vec![
                        video(),
                        worksheet("Planet Order Worksheet"),
                        quiz("Solar System Quiz", 10),
                    ],
                ),
                lesson(
                    "lesson3",
                    "Phases of the Moon",
                    vec![video(), worksheet("Moon Journal Worksheet")],
                ),
            ],
        ),
        course(
            "biology",
            "Living Things",
            vec![
                lesson(
                    "lesson1",
                    "How Plants Grow",
                    vec![
                        video(),
                        worksheet("Plant Parts Worksheet"),
                        quiz("Plant Growth Quiz", 12),
                    ],
                ),
                lesson(
                    "lesson2",
                    "Animal Habitats",
                    vec![video(), quiz("Habitats Quiz", 10)],
                ),
            ],
        ),
        course(
            "math",
            "Number Sense",
            vec![
                lesson(
                    "lesson1",
                    "Place Value",
                    vec![
                        video(),
                        worksheet("Place Value Worksheet"),
                        quiz("Place Value Quiz", 12),
                    ],
                ),
                lesson(
                    "lesson2",
                    "Fractions",
                    vec![
                        video(),
                        worksheet("Fraction Strips Worksheet"),
                        quiz("Fractions Quiz", 14),
                    ],
                ),
            ],
        ),
    ];

    CurriculumTemplate {
        courses: courses.into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
