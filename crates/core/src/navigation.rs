use crate::model::Course;
use crate::progress::EnrollmentProgress;
use crate::unlock::{Target, UnlockPolicy};

/// Result of asking for the next stop after a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Go(Target),
    /// Past the last stop of the course; callers check the certificate gate.
    CourseComplete,
}

/// Computes structural next/previous targets.
///
/// The course flattens to: every lesson of section 0 in order, then its quiz,
/// then section 1, and so on, with the final quiz last. Sections without
/// lessons or quiz contribute nothing. Unlock rules are not consulted here.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationSequencer;

impl NavigationSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Every stop of the course in traversal order.
    #[must_use]
    pub fn sequence(&self, course: &Course) -> Vec<Target> {
        let mut stops = Vec::with_capacity(course.total_lessons() + course.sections().len() + 1);
        for (section_index, section) in course.sections().iter().enumerate() {
            stops.extend((0..section.lessons().len()).map(|lesson| Target::Lesson {
                section: section_index,
                lesson,
            }));
            if section.has_quiz() {
                stops.push(Target::SectionQuiz {
                    section: section_index,
                });
            }
        }
        if course.final_quiz().is_some() {
            stops.push(Target::FinalQuiz);
        }
        stops
    }

    /// The stop after `from`, or `None` if `from` is not part of the course.
    #[must_use]
    pub fn next(&self, course: &Course, from: Target) -> Option<Step> {
        let stops = self.sequence(course);
        let index = stops.iter().position(|stop| *stop == from)?;
        Some(match stops.get(index + 1) {
            Some(next) => Step::Go(*next),
            None => Step::CourseComplete,
        })
    }

    /// The stop before `from`. `None` at the first stop or for unknown positions.
    ///
    /// From a section quiz this is always the last lesson of that section,
    /// regardless of how the learner arrived at the quiz.
    #[must_use]
    pub fn previous(&self, course: &Course, from: Target) -> Option<Target> {
        if let Target::SectionQuiz { section } = from {
            if let Some(last) = course
                .section(section)
                .filter(|s| s.has_quiz())
                .and_then(|s| s.last_lesson_index())
            {
                return Some(Target::Lesson {
                    section,
                    lesson: last,
                });
            }
        }

        let stops = self.sequence(course);
        let index = stops.iter().position(|stop| *stop == from)?;
        index.checked_sub(1).map(|prev| stops[prev])
    }

    #[must_use]
    pub fn first(&self, course: &Course) -> Option<Target> {
        self.sequence(course).first().copied()
    }

    /// Where a returning learner should land: the first unlocked stop that is
    /// not yet done. Falls back to the first stop when everything is done.
    #[must_use]
    pub fn resume(
        &self,
        course: &Course,
        progress: &EnrollmentProgress,
        policy: &UnlockPolicy,
    ) -> Option<Target> {
        let stops = self.sequence(course);
        stops
            .iter()
            .copied()
            .find(|stop| policy.is_unlocked(course, progress, *stop) && !is_done(course, progress, *stop))
            .or_else(|| stops.first().copied())
    }
}

/// Lesson completed, or quiz passed.
#[must_use]
pub fn is_done(course: &Course, progress: &EnrollmentProgress, target: Target) -> bool {
    match target {
        Target::Lesson { section, lesson } => course
            .section(section)
            .and_then(|s| s.lesson(lesson).map(|l| (s, l)))
            .is_some_and(|(s, l)| progress.is_lesson_completed(s.id(), l.id())),
        Target::SectionQuiz { section } => course
            .section(section)
            .is_some_and(|s| progress.section_quiz_passed(s.id())),
        Target::FinalQuiz => progress.final_quiz_passed(),
    }
}
