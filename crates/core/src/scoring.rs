//! Activity progress updates and earned-point rules.
//!
//! An update addresses one activity by `(course, lesson, activity)` and
//! carries a sparse [`ActivityPatch`]. The patch is validated against the
//! addressed node before anything is written, then overlaid field by field.
//! Earned points are recomputed for the activity, its lesson and its course;
//! nothing outside that path is touched.

use serde::Deserialize;

use crate::curriculum::ActivityType;
use crate::error::CoreError;
use crate::progress::{ActivityProgress, CourseProgress, LessonProgress, ProgressData};

/// Bonus credited to a lesson once every activity in it is completed.
pub const LESSON_COMPLETION_BONUS: i64 = 10;

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Sparse set of progress fields reported by a client for one activity.
///
/// Derived fields (`earned`, `percentCorrect`, video/quiz `completed`) are
/// never accepted from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivityPatch {
    pub percent_watched: Option<i64>,
    pub completed: Option<bool>,
    pub correct_answers: Option<i64>,
}

impl ActivityPatch {
    pub fn video(percent_watched: i64) -> Self {
        Self {
            percent_watched: Some(percent_watched),
            ..Self::default()
        }
    }

    pub fn worksheet(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn quiz(correct_answers: i64) -> Self {
        Self {
            correct_answers: Some(correct_answers),
            ..Self::default()
        }
    }

    /// Parse a client-supplied JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("Malformed progress patch: {e}")))
    }

    /// Check the patch against the activity it is about to be merged into.
    pub fn validate_for(&self, activity: &ActivityProgress) -> Result<(), CoreError> {
        let kind = activity.activity_type.as_str();
        let reject = |field: &str| -> Result<(), CoreError> {
            Err(CoreError::Validation(format!(
                "Field '{field}' does not apply to {kind} activities"
            )))
        };

        match activity.activity_type {
            ActivityType::Video => {
                if self.completed.is_some() {
                    return reject("completed");
                }
                if self.correct_answers.is_some() {
                    return reject("correctAnswers");
                }
                let percent = self.percent_watched.ok_or_else(|| {
                    CoreError::Validation("Video progress requires 'percentWatched'".to_string())
                })?;
                if !(0..=100).contains(&percent) {
                    return Err(CoreError::Validation(format!(
                        "percentWatched must be between 0 and 100, got {percent}"
                    )));
                }
            }
            ActivityType::Worksheet => {
                if self.percent_watched.is_some() {
                    return reject("percentWatched");
                }
                if self.correct_answers.is_some() {
                    return reject("correctAnswers");
                }
                if self.completed.is_none() {
                    return Err(CoreError::Validation(
                        "Worksheet progress requires 'completed'".to_string(),
                    ));
                }
            }
            ActivityType::Quiz => {
                if self.percent_watched.is_some() {
                    return reject("percentWatched");
                }
                if self.completed.is_some() {
                    return reject("completed");
                }
                let correct = self.correct_answers.ok_or_else(|| {
                    CoreError::Validation("Quiz progress requires 'correctAnswers'".to_string())
                })?;
                let questions = activity.questions_count.unwrap_or(0);
                if correct < 0 {
                    return Err(CoreError::Validation(format!(
                        "correctAnswers must not be negative, got {correct}"
                    )));
                }
                if correct > questions {
                    return Err(CoreError::Validation(format!(
                        "correctAnswers ({correct}) exceeds questionsCount ({questions})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Overlay every present field onto `activity`.
    fn merge_into(&self, activity: &mut ActivityProgress) {
        if let Some(percent) = self.percent_watched {
            activity.percent_watched = Some(percent);
        }
        if let Some(completed) = self.completed {
            activity.completed = completed;
        }
        if let Some(correct) = self.correct_answers {
            activity.correct_answers = Some(correct);
        }
    }
}

// ---------------------------------------------------------------------------
// Recompute rules
// ---------------------------------------------------------------------------

/// `round(numerator / denominator)` with halves rounded up.
///
/// Both operands must be non-negative and `denominator` non-zero.
fn round_div(numerator: i64, denominator: i64) -> i64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Recompute `earned`, `completed` and derived percentages of one activity.
pub fn recompute_activity(activity: &mut ActivityProgress) {
    match activity.activity_type {
        ActivityType::Video => {
            let percent = activity.percent_watched.unwrap_or(0);
            activity.earned = round_div(activity.points * percent, 100);
            activity.completed = percent >= 100;
        }
        ActivityType::Worksheet => {
            activity.earned = if activity.completed { activity.points } else { 0 };
        }
        ActivityType::Quiz => {
            let questions = activity.questions_count.unwrap_or(0);
            let percent = match activity.correct_answers {
                Some(correct) if questions > 0 => round_div(correct * 100, questions),
                _ => 0,
            };
            let mut earned = round_div(activity.points * percent, 100);
            if percent == 100 {
                earned += activity.extra_points.unwrap_or(0);
            }
            activity.percent_correct = Some(percent);
            activity.earned = earned;
            activity.completed = activity.correct_answers.is_some();
        }
    }
}

/// Recompute lesson completion and `lessonPoints` from its activities.
pub fn recompute_lesson(lesson: &mut LessonProgress) {
    lesson.completed =
        !lesson.activities.is_empty() && lesson.activities.values().all(|a| a.completed);
    let earned: i64 = lesson.activities.values().map(|a| a.earned).sum();
    lesson.lesson_points = if lesson.completed {
        earned + LESSON_COMPLETION_BONUS
    } else {
        earned
    };
}

/// Recompute course completion and `coursePoints` from its lessons.
pub fn recompute_course(course: &mut CourseProgress) {
    course.completed = !course.lessons.is_empty() && course.lessons.values().all(|l| l.completed);
    course.course_points = course.lessons.values().map(|l| l.lesson_points).sum();
}

/// Recompute every node of a document from its activity state.
pub fn recompute_all(data: &mut ProgressData) {
    for course in data.courses.values_mut() {
        for lesson in course.lessons.values_mut() {
            lesson.activities.values_mut().for_each(recompute_activity);
            recompute_lesson(lesson);
        }
        recompute_course(course);
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// State of the addressed path after an update was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityOutcome {
    pub earned: i64,
    pub completed: bool,
    pub lesson_points: i64,
    pub lesson_completed: bool,
    pub course_points: i64,
}

/// Merge `patch` into the addressed activity and recompute its ancestors.
///
/// Fails with `NotFound` for an unknown address and `Validation` for a
/// malformed patch; in both cases `data` is left untouched.
pub fn apply_activity_update(
    data: &mut ProgressData,
    course_id: &str,
    lesson_id: &str,
    activity_key: &str,
    patch: &ActivityPatch,
) -> Result<ActivityOutcome, CoreError> {
    let not_found = || CoreError::activity_not_found(course_id, lesson_id, activity_key);

    let course = data.courses.get_mut(course_id).ok_or_else(not_found)?;
    let lesson = course.lessons.get_mut(lesson_id).ok_or_else(not_found)?;
    let activity = lesson.activities.get_mut(activity_key).ok_or_else(not_found)?;

    patch.validate_for(activity)?;
    patch.merge_into(activity);
    recompute_activity(activity);
    let (earned, completed) = (activity.earned, activity.completed);

    recompute_lesson(lesson);
    let (lesson_points, lesson_completed) = (lesson.lesson_points, lesson.completed);

    recompute_course(course);

    Ok(ActivityOutcome {
        earned,
        completed,
        lesson_points,
        lesson_completed,
        course_points: course.course_points,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::curriculum::{QUIZ_PERFECT_BONUS, QUIZ_POINTS};
    use crate::progress::instantiate_progress;

    fn quiz_node(questions: i64) -> ActivityProgress {
        ActivityProgress {
            activity_type: ActivityType::Quiz,
            title: Some("Quiz".to_string()),
            points: QUIZ_POINTS,
            extra_points: Some(QUIZ_PERFECT_BONUS),
            questions_count: Some(questions),
            completed: false,
            earned: 0,
            percent_watched: None,
            correct_answers: None,
            percent_correct: Some(0),
        }
    }

    // -- round_div ----------------------------------------------------------

    #[test]
    fn round_div_rounds_halves_up() {
        assert_eq!(round_div(350, 100), 4);
        assert_eq!(round_div(349, 100), 3);
        assert_eq!(round_div(355, 100), 4);
        assert_eq!(round_div(0, 14), 0);
    }

    // -- Video --------------------------------------------------------------

    #[test]
    fn video_half_watched_earns_rounded_partial_credit() {
        let mut data = instantiate_progress();
        let outcome = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "video",
            &ActivityPatch::video(50),
        )
        .unwrap();

        assert_eq!(outcome.earned, 4);
        assert!(!outcome.completed);
        let video = data.activity("astronomy", "lesson1", "video").unwrap();
        assert_eq!(video.percent_watched, Some(50));
    }

    #[test]
    fn video_fully_watched_completes() {
        let mut data = instantiate_progress();
        let outcome = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "video",
            &ActivityPatch::video(100),
        )
        .unwrap();

        assert_eq!(outcome.earned, 7);
        assert!(outcome.completed);
    }

    #[test]
    fn video_rewatch_lower_percent_lowers_credit() {
        let mut data = instantiate_progress();
        for percent in [100, 20] {
            apply_activity_update(
                &mut data,
                "math",
                "lesson1",
                "video",
                &ActivityPatch::video(percent),
            )
            .unwrap();
        }
        let video = data.activity("math", "lesson1", "video").unwrap();
        assert_eq!(video.earned, 1);
        assert!(!video.completed);
    }

    #[test]
    fn video_percent_out_of_range_is_rejected() {
        let mut data = instantiate_progress();
        for percent in [-1, 101] {
            let err = apply_activity_update(
                &mut data,
                "astronomy",
                "lesson1",
                "video",
                &ActivityPatch::video(percent),
            )
            .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
        assert_eq!(data, instantiate_progress());
    }

    // -- Worksheet ----------------------------------------------------------

    #[test]
    fn worksheet_is_binary() {
        let mut data = instantiate_progress();
        let done = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "worksheet",
            &ActivityPatch::worksheet(true),
        )
        .unwrap();
        assert_eq!(done.earned, 5);
        assert!(done.completed);

        let undone = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "worksheet",
            &ActivityPatch::worksheet(false),
        )
        .unwrap();
        assert_eq!(undone.earned, 0);
        assert!(!undone.completed);
    }

    // -- Quiz ---------------------------------------------------------------

    #[test]
    fn quiz_perfect_score_earns_bonus() {
        let mut quiz = quiz_node(14);
        quiz.correct_answers = Some(14);
        recompute_activity(&mut quiz);
        assert_eq!(quiz.percent_correct, Some(100));
        assert_eq!(quiz.earned, 10);
        assert!(quiz.completed);
    }

    #[test]
    fn quiz_partial_score_is_prorated_without_bonus() {
        let mut quiz = quiz_node(14);
        quiz.correct_answers = Some(10);
        recompute_activity(&mut quiz);
        assert_eq!(quiz.percent_correct, Some(71));
        assert_eq!(quiz.earned, 4);
        assert!(quiz.completed);
    }

    #[test]
    fn quiz_zero_correct_still_completes() {
        let mut data = instantiate_progress();
        let outcome = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "quiz",
            &ActivityPatch::quiz(0),
        )
        .unwrap();
        assert_eq!(outcome.earned, 0);
        assert!(outcome.completed);
    }

    #[test]
    fn quiz_without_questions_scores_zero_percent() {
        let mut quiz = quiz_node(0);
        quiz.correct_answers = Some(0);
        recompute_activity(&mut quiz);
        assert_eq!(quiz.percent_correct, Some(0));
        assert_eq!(quiz.earned, 0);
    }

    #[test]
    fn quiz_more_correct_than_questions_is_rejected() {
        let mut data = instantiate_progress();
        let err = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "quiz",
            &ActivityPatch::quiz(15),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(data, instantiate_progress());
    }

    // -- Patch validation ---------------------------------------------------

    #[test]
    fn missing_required_field_is_rejected() {
        let video = instantiate_progress()
            .activity("astronomy", "lesson1", "video")
            .cloned()
            .unwrap();
        assert!(ActivityPatch::default().validate_for(&video).is_err());
    }

    #[test]
    fn fields_for_other_types_are_rejected() {
        let data = instantiate_progress();
        let video = data.activity("astronomy", "lesson1", "video").unwrap();
        let worksheet = data.activity("astronomy", "lesson1", "worksheet").unwrap();
        let quiz = data.activity("astronomy", "lesson1", "quiz").unwrap();

        let mut patch = ActivityPatch::video(100);
        patch.completed = Some(true);
        assert!(patch.validate_for(video).is_err());
        assert!(ActivityPatch::quiz(3).validate_for(worksheet).is_err());
        assert!(ActivityPatch::worksheet(true).validate_for(quiz).is_err());
    }

    #[test]
    fn patch_from_json_rejects_unknown_keys() {
        let patch = ActivityPatch::from_json(serde_json::json!({ "percentWatched": 40 })).unwrap();
        assert_eq!(patch, ActivityPatch::video(40));

        let err = ActivityPatch::from_json(serde_json::json!({ "earned": 99 })).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    // -- Addressing ---------------------------------------------------------

    #[test]
    fn unknown_activity_is_not_found_and_leaves_document_unchanged() {
        let mut data = instantiate_progress();
        let err = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "nonexistent_activity",
            &ActivityPatch::video(100),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "activity", .. }));
        assert_eq!(data, instantiate_progress());

        assert!(apply_activity_update(
            &mut data,
            "chemistry",
            "lesson1",
            "video",
            &ActivityPatch::video(100),
        )
        .is_err());
        assert!(apply_activity_update(
            &mut data,
            "astronomy",
            "lesson7",
            "video",
            &ActivityPatch::video(100),
        )
        .is_err());
    }

    #[test]
    fn siblings_are_untouched() {
        let mut data = instantiate_progress();
        apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "video",
            &ActivityPatch::video(100),
        )
        .unwrap();

        let fresh = instantiate_progress();
        assert_eq!(
            data.activity("astronomy", "lesson1", "worksheet"),
            fresh.activity("astronomy", "lesson1", "worksheet")
        );
        assert_eq!(data.lesson("astronomy", "lesson2"), fresh.lesson("astronomy", "lesson2"));
        assert_eq!(data.courses["math"], fresh.courses["math"]);
    }

    // -- Lesson / course aggregates -----------------------------------------

    #[test]
    fn completed_lesson_earns_bonus() {
        let mut video = ActivityProgress::from_template(
            crate::curriculum::template()
                .activity("astronomy", "lesson3", "video")
                .unwrap(),
        );
        video.completed = true;
        video.earned = 7;
        let mut worksheet = ActivityProgress::from_template(
            crate::curriculum::template()
                .activity("astronomy", "lesson3", "worksheet")
                .unwrap(),
        );
        worksheet.completed = true;
        worksheet.earned = 5;

        let mut lesson = LessonProgress {
            title: "Phases of the Moon".to_string(),
            completed: false,
            lesson_points: 0,
            activities: BTreeMap::from([
                ("video".to_string(), video),
                ("worksheet".to_string(), worksheet),
            ]),
        };
        recompute_lesson(&mut lesson);
        assert!(lesson.completed);
        assert_eq!(lesson.lesson_points, 22);
    }

    #[test]
    fn lesson_completes_through_updates() {
        let mut data = instantiate_progress();
        apply_activity_update(
            &mut data,
            "astronomy",
            "lesson3",
            "video",
            &ActivityPatch::video(100),
        )
        .unwrap();
        let outcome = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson3",
            "worksheet",
            &ActivityPatch::worksheet(true),
        )
        .unwrap();

        assert!(outcome.lesson_completed);
        assert_eq!(outcome.lesson_points, 22);
        assert_eq!(outcome.course_points, 22);
        assert!(!data.courses["astronomy"].completed);
    }

    #[test]
    fn partially_completed_lesson_has_no_bonus() {
        let mut data = instantiate_progress();
        let outcome = apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "video",
            &ActivityPatch::video(100),
        )
        .unwrap();
        assert!(!outcome.lesson_completed);
        assert_eq!(outcome.lesson_points, 7);
    }

    #[test]
    fn course_completes_when_all_lessons_complete() {
        let mut data = instantiate_progress();
        let updates = [
            ("lesson1", "video", ActivityPatch::video(100)),
            ("lesson1", "quiz", ActivityPatch::quiz(12)),
            ("lesson2", "video", ActivityPatch::video(100)),
            ("lesson2", "quiz", ActivityPatch::quiz(5)),
            ("lesson1", "worksheet", ActivityPatch::worksheet(true)),
        ];
        for (lesson, activity, patch) in &updates {
            apply_activity_update(&mut data, "biology", lesson, activity, patch).unwrap();
        }

        let course = &data.courses["biology"];
        assert!(course.completed);
        // lesson1: 7 + 5 + 10 + 10 bonus; lesson2: 7 + 3 + 10 bonus.
        assert_eq!(course.lessons["lesson1"].lesson_points, 32);
        assert_eq!(course.lessons["lesson2"].lesson_points, 20);
        assert_eq!(course.course_points, 52);
    }

    #[test]
    fn recompute_all_repairs_stale_aggregates() {
        let mut data = instantiate_progress();
        apply_activity_update(
            &mut data,
            "astronomy",
            "lesson1",
            "video",
            &ActivityPatch::video(100),
        )
        .unwrap();
        let expected = data.clone();

        let lesson = data
            .courses
            .get_mut("astronomy")
            .and_then(|c| c.lessons.get_mut("lesson1"))
            .unwrap();
        lesson.lesson_points = 999;
        recompute_all(&mut data);
        assert_eq!(data, expected);
    }
}
