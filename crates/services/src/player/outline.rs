use course_core::model::Course;
use course_core::{EnrollmentProgress, Target, UnlockPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLesson {
    pub target: Target,
    pub title: String,
    pub completed: bool,
    pub unlocked: bool,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineQuiz {
    pub target: Target,
    pub passed: bool,
    pub score: Option<u32>,
    pub unlocked: bool,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub title: String,
    pub percent: u8,
    pub lessons: Vec<OutlineLesson>,
    pub quiz: Option<OutlineQuiz>,
}

/// Sidebar contents, recomputed from scratch on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    pub title: String,
    pub overall_percent: u8,
    pub sections: Vec<OutlineSection>,
    pub final_quiz: Option<OutlineQuiz>,
}

impl CourseOutline {
    #[must_use]
    pub fn build(
        course: &Course,
        progress: &EnrollmentProgress,
        policy: &UnlockPolicy,
        current: Option<Target>,
    ) -> Self {
        let sections = course
            .sections()
            .iter()
            .enumerate()
            .map(|(section_index, section)| {
                let lessons = section
                    .lessons()
                    .iter()
                    .enumerate()
                    .map(|(lesson_index, lesson)| {
                        let target = Target::Lesson {
                            section: section_index,
                            lesson: lesson_index,
                        };
                        OutlineLesson {
                            target,
                            title: lesson.title().to_string(),
                            completed: progress.is_lesson_completed(section.id(), lesson.id()),
                            unlocked: policy.is_unlocked(course, progress, target),
                            current: current == Some(target),
                        }
                    })
                    .collect();

                let quiz = section.has_quiz().then(|| {
                    let target = Target::SectionQuiz {
                        section: section_index,
                    };
                    let score = progress.section_quiz_score(section.id());
                    OutlineQuiz {
                        target,
                        passed: score.is_some_and(|s| s.passed),
                        score: score.map(|s| s.score),
                        unlocked: policy.is_unlocked(course, progress, target),
                        current: current == Some(target),
                    }
                });

                OutlineSection {
                    title: section.title().to_string(),
                    percent: progress
                        .section_completion(course, section_index)
                        .map_or(0, |completion| completion.percent()),
                    lessons,
                    quiz,
                }
            })
            .collect();

        let final_quiz = course.final_quiz().map(|_| {
            let score = progress.final_quiz_score();
            OutlineQuiz {
                target: Target::FinalQuiz,
                passed: score.is_some_and(|s| s.passed),
                score: score.map(|s| s.score),
                unlocked: policy.is_unlocked(course, progress, Target::FinalQuiz),
                current: current == Some(Target::FinalQuiz),
            }
        });

        Self {
            title: course.title().to_string(),
            overall_percent: progress.overall_percent(),
            sections,
            final_quiz,
        }
    }
}
