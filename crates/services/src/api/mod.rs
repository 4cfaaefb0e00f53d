//! The REST surface the player consumes.

use async_trait::async_trait;
use serde::Serialize;

use course_core::model::{
    AuthToken, Certificate, CertificateId, Course, CourseId, Enrollment, LessonId, Quiz,
    QuizId, QuizOutcome, SectionId, SubmittedAnswer,
};

use crate::error::ApiError;

mod http;
mod wire;

pub use http::HttpCourseApi;

/// Course plus the caller's enrollment, when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDetail {
    pub course: Course,
    pub enrollment: Option<Enrollment>,
}

/// Body of the lesson completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    #[serde(skip)]
    pub course_id: CourseId,
    pub section_id: SectionId,
    pub lesson_id: LessonId,
    pub time_spent_minutes: u32,
}

/// Body of a quiz submission. `section_id` is absent for the final quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(skip)]
    pub quiz_id: QuizId,
    pub course_id: CourseId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    pub answers: Vec<SubmittedAnswer>,
}

/// Server contract for course progression.
///
/// Calls that change or reveal a learner's progress require a token; the
/// course and quiz documents may be fetched anonymously.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn get_course(
        &self,
        token: Option<&AuthToken>,
        course: &CourseId,
    ) -> Result<CourseDetail, ApiError>;

    async fn enroll(&self, token: &AuthToken, course: &CourseId) -> Result<Enrollment, ApiError>;

    async fn get_enrollment(
        &self,
        token: &AuthToken,
        course: &CourseId,
    ) -> Result<Enrollment, ApiError>;

    /// Returns the full updated enrollment.
    async fn complete_lesson(
        &self,
        token: &AuthToken,
        request: &LessonCompletion,
    ) -> Result<Enrollment, ApiError>;

    async fn get_quiz(&self, token: Option<&AuthToken>, quiz: &QuizId) -> Result<Quiz, ApiError>;

    async fn submit_quiz(
        &self,
        token: &AuthToken,
        submission: &QuizSubmission,
    ) -> Result<QuizOutcome, ApiError>;

    async fn get_certificate(
        &self,
        token: &AuthToken,
        certificate: &CertificateId,
    ) -> Result<Certificate, ApiError>;
}
