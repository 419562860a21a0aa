//! Points aggregation and dashboard summaries.
//!
//! Totals are always derived by walking the whole document. Nothing here
//! maintains incremental counters, so a cached total can be checked against
//! [`compute_total`] at any time.

use serde::Serialize;

use crate::progress::{CourseProgress, LessonProgress, ProgressData};
use crate::scoring::LESSON_COMPLETION_BONUS;

/// Sum of every activity's `earned` plus the bonus for each completed lesson.
pub fn compute_total(data: &ProgressData) -> i64 {
    data.courses
        .values()
        .flat_map(|course| course.lessons.values())
        .map(|lesson| {
            let earned: i64 = lesson.activities.values().map(|a| a.earned).sum();
            if lesson.completed {
                earned + LESSON_COMPLETION_BONUS
            } else {
                earned
            }
        })
        .sum()
}

fn lesson_possible_points(lesson: &LessonProgress) -> i64 {
    let activities: i64 = lesson.activities.values().map(|a| a.max_points()).sum();
    activities + LESSON_COMPLETION_BONUS
}

/// Per-course progress figures for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: String,
    pub title: String,
    pub points_earned: i64,
    pub points_possible: i64,
    pub lessons_completed: usize,
    pub lesson_count: usize,
    /// Share of completed lessons, 0-100.
    pub percent_complete: i64,
    pub completed: bool,
}

impl CourseSummary {
    fn from_course(course_id: &str, course: &CourseProgress) -> Self {
        let lesson_count = course.lessons.len();
        let lessons_completed = course.lessons.values().filter(|l| l.completed).count();
        let percent_complete = if lesson_count == 0 {
            0
        } else {
            (lessons_completed * 100 / lesson_count) as i64
        };

        Self {
            course_id: course_id.to_string(),
            title: course.title.clone(),
            points_earned: course.course_points,
            points_possible: course.lessons.values().map(lesson_possible_points).sum(),
            lessons_completed,
            lesson_count,
            percent_complete,
            completed: course.completed,
        }
    }
}

/// Whole-document summary: recomputed total plus one entry per course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_points: i64,
    pub max_points: i64,
    pub courses: Vec<CourseSummary>,
}

pub fn summarize(data: &ProgressData) -> ProgressSummary {
    let courses: Vec<CourseSummary> = data
        .courses
        .iter()
        .map(|(id, course)| CourseSummary::from_course(id, course))
        .collect();

    ProgressSummary {
        total_points: compute_total(data),
        max_points: courses.iter().map(|c| c.points_possible).sum(),
        courses,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::instantiate_progress;
    use crate::scoring::{apply_activity_update, ActivityPatch};

    fn apply(
        data: &mut ProgressData,
        course: &str,
        lesson: &str,
        activity: &str,
        patch: ActivityPatch,
    ) {
        apply_activity_update(data, course, lesson, activity, &patch).unwrap();
    }

    #[test]
    fn fresh_document_totals_zero() {
        assert_eq!(compute_total(&instantiate_progress()), 0);
    }

    #[test]
    fn total_sums_earned_across_courses() {
        let mut data = instantiate_progress();
        apply(&mut data, "astronomy", "lesson1", "video", ActivityPatch::video(50));
        apply(&mut data, "math", "lesson2", "quiz", ActivityPatch::quiz(14));
        assert_eq!(compute_total(&data), 4 + 10);
    }

    #[test]
    fn total_includes_lesson_bonus() {
        let mut data = instantiate_progress();
        apply(&mut data, "astronomy", "lesson3", "video", ActivityPatch::video(100));
        apply(&mut data, "astronomy", "lesson3", "worksheet", ActivityPatch::worksheet(true));
        assert_eq!(compute_total(&data), 22);
    }

    #[test]
    fn total_matches_course_points() {
        let mut data = instantiate_progress();
        apply(&mut data, "biology", "lesson2", "video", ActivityPatch::video(100));
        apply(&mut data, "biology", "lesson2", "quiz", ActivityPatch::quiz(7));
        apply(&mut data, "astronomy", "lesson2", "worksheet", ActivityPatch::worksheet(true));

        let course_sum: i64 = data.courses.values().map(|c| c.course_points).sum();
        assert_eq!(compute_total(&data), course_sum);
    }

    #[test]
    fn summary_reports_per_course_figures() {
        let mut data = instantiate_progress();
        apply(&mut data, "astronomy", "lesson3", "video", ActivityPatch::video(100));
        apply(&mut data, "astronomy", "lesson3", "worksheet", ActivityPatch::worksheet(true));

        let summary = summarize(&data);
        assert_eq!(summary.total_points, 22);
        // astronomy 32 + 32 + 22, biology 32 + 27, math 32 + 32.
        assert_eq!(summary.max_points, 209);

        let astronomy = summary
            .courses
            .iter()
            .find(|c| c.course_id == "astronomy")
            .unwrap();
        assert_eq!(astronomy.points_earned, 22);
        assert_eq!(astronomy.lessons_completed, 1);
        assert_eq!(astronomy.lesson_count, 3);
        assert_eq!(astronomy.percent_complete, 33);
        assert!(!astronomy.completed);
    }
}
