use crate::model::Course;
use crate::progress::EnrollmentProgress;

/// Something a learner may try to open, addressed by normalized indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Lesson { section: usize, lesson: usize },
    SectionQuiz { section: usize },
    FinalQuiz,
}

/// Decides whether a lesson or quiz is accessible.
///
/// The policy is a pure predicate over the course structure and the current
/// enrollment progress. Nothing is cached: callers ask again after every
/// server round trip.
///
/// Rules:
///
/// 1. The first lesson of the first section is always open.
/// 2. Lesson `i > 0` opens once lesson `i - 1` of the same section is completed.
/// 3. Lesson 0 of section `s > 0` opens once section `s - 1` is cleared: its
///    quiz passed, or, for a section without a quiz, all of its lessons
///    completed. An empty section without a quiz defers to the one before it.
/// 4. A section quiz opens once every lesson of its section is completed.
///
/// The final quiz opens once every section is cleared.
///
/// # Examples
///
/// ```
/// # use course_core::model::{Course, CourseId, Enrollment, Lesson, LessonId, Section, SectionId};
/// # use course_core::progress::EnrollmentProgress;
/// # use course_core::unlock::{Target, UnlockPolicy};
/// let section = Section::new(
///     SectionId::new("s"),
///     "Basics",
///     0,
///     vec![Lesson::new(LessonId::new("a"), "A", 0), Lesson::new(LessonId::new("b"), "B", 1)],
///     None,
/// )?;
/// let course = Course::new(CourseId::new("c"), "Course", vec![section], None)?;
/// let progress = EnrollmentProgress::from_enrollment(&Enrollment::new(CourseId::new("c")));
///
/// let policy = UnlockPolicy::new();
/// assert!(policy.is_unlocked(&course, &progress, Target::Lesson { section: 0, lesson: 0 }));
/// assert!(!policy.is_unlocked(&course, &progress, Target::Lesson { section: 0, lesson: 1 }));
/// # Ok::<(), course_core::model::CourseError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlockPolicy;

impl UnlockPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `false` for targets that do not exist in `course`.
    #[must_use]
    pub fn is_unlocked(&self, course: &Course, progress: &EnrollmentProgress, target: Target) -> bool {
        match target {
            Target::Lesson { section, lesson } => {
                self.lesson_unlocked(course, progress, section, lesson)
            }
            Target::SectionQuiz { section } => course
                .section(section)
                .is_some_and(|s| s.has_quiz() && all_lessons_completed(course, progress, section)),
            Target::FinalQuiz => {
                course.final_quiz().is_some()
                    && (0..course.sections().len())
                        .all(|index| section_cleared(course, progress, index))
            }
        }
    }

    fn lesson_unlocked(
        &self,
        course: &Course,
        progress: &EnrollmentProgress,
        section: usize,
        lesson: usize,
    ) -> bool {
        let Some(current) = course.section(section) else {
            return false;
        };
        if lesson >= current.lessons().len() {
            return false;
        }

        if lesson > 0 {
            let previous = &current.lessons()[lesson - 1];
            return progress.is_lesson_completed(current.id(), previous.id());
        }

        if section == 0 {
            return true;
        }

        previous_sections_cleared(course, progress, section)
    }
}

/// Every lesson of the section at `index` is completed. Vacuously true for
/// a section without lessons.
#[must_use]
pub fn all_lessons_completed(course: &Course, progress: &EnrollmentProgress, index: usize) -> bool {
    course.section(index).is_some_and(|section| {
        section
            .lessons()
            .iter()
            .all(|lesson| progress.is_lesson_completed(section.id(), lesson.id()))
    })
}

/// A section is cleared when its quiz is passed, or, lacking a quiz, when all
/// of its lessons are completed.
#[must_use]
pub fn section_cleared(course: &Course, progress: &EnrollmentProgress, index: usize) -> bool {
    let Some(section) = course.section(index) else {
        return false;
    };
    if section.has_quiz() {
        progress.section_quiz_passed(section.id())
    } else {
        all_lessons_completed(course, progress, index)
    }
}

// Lesson 0 of `section` depends on the nearest preceding section that has any
// content. Empty quiz-less sections are skipped over.
fn previous_sections_cleared(course: &Course, progress: &EnrollmentProgress, section: usize) -> bool {
    for index in (0..section).rev() {
        let Some(previous) = course.section(index) else {
            return false;
        };
        if previous.has_quiz() || !previous.lessons().is_empty() {
            return section_cleared(course, progress, index);
        }
    }
    true
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
