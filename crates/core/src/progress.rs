use std::collections::{HashMap, HashSet};

use crate::model::{Course, Enrollment, LessonId, QuizScore, SectionId};

/// Completion counts for one section, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCompletion {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub quiz_passed: Option<bool>,
}

impl SectionCompletion {
    /// Share of completed lessons, rounded down to a whole percent.
    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_of(self.completed_lessons, self.total_lessons)
    }
}

/// Normalized view of an [`Enrollment`] for fast lookups.
///
/// Rebuilt from scratch every time the server hands back a new enrollment;
/// it has no mutators of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentProgress {
    completed: HashSet<(SectionId, LessonId)>,
    section_quiz: HashMap<SectionId, QuizScore>,
    final_quiz: Option<QuizScore>,
    overall_percent: u8,
    certificate_issued: bool,
}

impl EnrollmentProgress {
    #[must_use]
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        let mut completed = HashSet::new();
        let mut section_quiz = HashMap::new();

        for section in &enrollment.section_progress {
            for lesson in section.lessons.iter().filter(|l| l.is_completed) {
                completed.insert((section.section_id.clone(), lesson.lesson_id.clone()));
            }
            if let Some(score) = section.section_quiz_score {
                section_quiz.insert(section.section_id.clone(), score);
            }
        }

        Self {
            completed,
            section_quiz,
            final_quiz: enrollment.final_quiz_score,
            overall_percent: enrollment.overall_percent(),
            certificate_issued: enrollment.certificate_issued,
        }
    }

    #[must_use]
    pub fn is_lesson_completed(&self, section: &SectionId, lesson: &LessonId) -> bool {
        self.completed.contains(&(section.clone(), lesson.clone()))
    }

    #[must_use]
    pub fn section_quiz_score(&self, section: &SectionId) -> Option<QuizScore> {
        self.section_quiz.get(section).copied()
    }

    /// `true` only when the server recorded `passed = true` for the section quiz.
    #[must_use]
    pub fn section_quiz_passed(&self, section: &SectionId) -> bool {
        self.section_quiz.get(section).is_some_and(|score| score.passed)
    }

    #[must_use]
    pub fn final_quiz_score(&self) -> Option<QuizScore> {
        self.final_quiz
    }

    #[must_use]
    pub fn final_quiz_passed(&self) -> bool {
        self.final_quiz.is_some_and(|score| score.passed)
    }

    /// Server-computed overall progress.
    #[must_use]
    pub fn overall_percent(&self) -> u8 {
        self.overall_percent
    }

    #[must_use]
    pub fn certificate_issued(&self) -> bool {
        self.certificate_issued
    }

    #[must_use]
    pub fn completed_lesson_count(&self) -> usize {
        self.completed.len()
    }

    /// Completion of the section at `index`, or `None` if out of range.
    #[must_use]
    pub fn section_completion(&self, course: &Course, index: usize) -> Option<SectionCompletion> {
        let section = course.section(index)?;
        let completed_lessons = section
            .lessons()
            .iter()
            .filter(|lesson| self.is_lesson_completed(section.id(), lesson.id()))
            .count();

        Some(SectionCompletion {
            total_lessons: section.lessons().len(),
            completed_lessons,
            quiz_passed: section
                .has_quiz()
                .then(|| self.section_quiz_passed(section.id())),
        })
    }

    /// Lesson-based completion for the whole course, computed locally.
    ///
    /// The server's [`overall_percent`](Self::overall_percent) stays the value
    /// shown as authoritative; this one only counts lessons of the loaded course.
    #[must_use]
    pub fn lesson_percent(&self, course: &Course) -> u8 {
        let completed: usize = (0..course.sections().len())
            .filter_map(|index| self.section_completion(course, index))
            .map(|c| c.completed_lessons)
            .sum();
        percent_of(completed, course.total_lessons())
    }
}

fn percent_of(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let percent = part.min(whole) * 100 / whole;
    u8::try_from(percent).unwrap_or(100)
}
