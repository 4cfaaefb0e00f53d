use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::certificate::CertificateRef;
use crate::model::ids::{CourseId, LessonId, SectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Dropped,
    #[serde(alias = "on_hold", alias = "onHold")]
    OnHold,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub lesson_id: LessonId,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_minutes: Option<u32>,
}

/// Server-graded quiz result stored on the enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub score: u32,
    pub passed: bool,
    #[serde(default)]
    pub attempt_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub section_id: SectionId,
    #[serde(default)]
    pub lessons: Vec<LessonProgress>,
    #[serde(default)]
    pub section_quiz_score: Option<QuizScore>,
}

/// A learner's progress record for one course.
///
/// Only ever replaced wholesale by a server response; the client never edits
/// completion or pass flags in place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(default, alias = "course")]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub overall_progress: f64,
    #[serde(default)]
    pub section_progress: Vec<SectionProgress>,
    #[serde(default)]
    pub final_quiz_score: Option<QuizScore>,
    #[serde(default)]
    pub certificate_issued: bool,
    #[serde(default)]
    pub certificate: Option<CertificateRef>,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// A fresh active enrollment with no progress.
    #[must_use]
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id: Some(course_id),
            status: EnrollmentStatus::Active,
            overall_progress: 0.0,
            section_progress: Vec::new(),
            final_quiz_score: None,
            certificate_issued: false,
            certificate: None,
            enrolled_at: None,
        }
    }

    /// Server-computed progress, clamped and rounded to a whole percent.
    #[must_use]
    pub fn overall_percent(&self) -> u8 {
        if !self.overall_progress.is_finite() {
            return 0;
        }
        // Clamped to 0..=100 first, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = self.overall_progress.clamp(0.0, 100.0).round() as u8;
        percent
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&SectionProgress> {
        self.section_progress.iter().find(|s| &s.section_id == id)
    }

    // ─── Fixture builders ──────────────────────────────────────────────────────
    //
    // These mirror what the server does and are used to build server responses
    // in fakes and tests.

    #[must_use]
    pub fn with_lesson_completed(mut self, section: &SectionId, lesson: &LessonId) -> Self {
        let entry = self.section_entry(section);
        match entry.lessons.iter_mut().find(|l| &l.lesson_id == lesson) {
            Some(progress) => progress.is_completed = true,
            None => entry.lessons.push(LessonProgress {
                lesson_id: lesson.clone(),
                is_completed: true,
                completed_at: None,
                time_spent_minutes: None,
            }),
        }
        self
    }

    #[must_use]
    pub fn with_section_quiz(mut self, section: &SectionId, score: QuizScore) -> Self {
        self.section_entry(section).section_quiz_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_final_quiz(mut self, score: QuizScore) -> Self {
        self.final_quiz_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_overall_progress(mut self, progress: f64) -> Self {
        self.overall_progress = progress;
        self
    }

    #[must_use]
    pub fn with_certificate(mut self, certificate: CertificateRef) -> Self {
        self.certificate_issued = true;
        self.certificate = Some(certificate);
        self
    }

    fn section_entry(&mut self, section: &SectionId) -> &mut SectionProgress {
        let index = match self
            .section_progress
            .iter()
            .position(|s| &s.section_id == section)
        {
            Some(index) => index,
            None => {
                self.section_progress.push(SectionProgress {
                    section_id: section.clone(),
                    lessons: Vec::new(),
                    section_quiz_score: None,
                });
                self.section_progress.len() - 1
            }
        };
        &mut self.section_progress[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::CertificateId;
    use serde_json::json;

    #[test]
    fn decodes_server_enrollment() {
        let enrollment: Enrollment = serde_json::from_value(json!({
            "course": "c1",
            "status": "on-hold",
            "overallProgress": 66.6,
            "sectionProgress": [
                {
                    "sectionId": "s1",
                    "lessons": [
                        { "lessonId": "l1", "isCompleted": true },
                        { "lessonId": "l2", "isCompleted": false }
                    ],
                    "sectionQuizScore": { "score": 90, "passed": true, "attemptCount": 1 }
                }
            ],
            "certificateIssued": true,
            "certificate": "cert-1"
        }))
        .unwrap();

        assert_eq!(enrollment.status, EnrollmentStatus::OnHold);
        assert_eq!(enrollment.overall_percent(), 67);
        let section = enrollment.section(&SectionId::new("s1")).unwrap();
        assert!(section.lessons[0].is_completed);
        assert!(section.section_quiz_score.unwrap().passed);
        assert_eq!(
            enrollment.certificate.as_ref().map(CertificateRef::id),
            Some(&CertificateId::new("cert-1"))
        );
    }

    #[test]
    fn overall_percent_is_clamped() {
        let e = Enrollment::new(CourseId::new("c")).with_overall_progress(140.0);
        assert_eq!(e.overall_percent(), 100);
        let e = Enrollment::new(CourseId::new("c")).with_overall_progress(f64::NAN);
        assert_eq!(e.overall_percent(), 0);
    }

    #[test]
    fn builder_does_not_duplicate_lessons() {
        let s = SectionId::new("s");
        let l = LessonId::new("l");
        let e = Enrollment::new(CourseId::new("c"))
            .with_lesson_completed(&s, &l)
            .with_lesson_completed(&s, &l);
        assert_eq!(e.section(&s).unwrap().lessons.len(), 1);
    }
}
