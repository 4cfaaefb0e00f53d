use chrono::{DateTime, Utc};
use tracing::info;

use course_core::LessonTimer;
use course_core::model::{AuthSession, CourseId, Enrollment, LessonId, SectionId};

use crate::api::{CourseApi, LessonCompletion};
use crate::error::{ApiError, FlowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonFlowState {
    Idle,
    Submitting,
    Completed,
    Failed(FlowError),
}

/// Marks one open lesson as completed on the server.
///
/// Created when the lesson view opens; the timer starts then. On success the
/// caller replaces its enrollment with the returned one. On failure nothing
/// local changes and the learner may submit again.
#[derive(Debug, Clone)]
pub struct LessonCompletionFlow {
    course_id: CourseId,
    section_id: SectionId,
    lesson_id: LessonId,
    timer: LessonTimer,
    state: LessonFlowState,
}

impl LessonCompletionFlow {
    #[must_use]
    pub fn open(
        course_id: CourseId,
        section_id: SectionId,
        lesson_id: LessonId,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id,
            section_id,
            lesson_id,
            timer: LessonTimer::start(opened_at),
            state: LessonFlowState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LessonFlowState {
        &self.state
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.state == LessonFlowState::Submitting
    }

    /// Moves to `Submitting` and returns the request to send.
    ///
    /// # Errors
    ///
    /// `FlowError::InFlight` while a submission is pending, and
    /// `FlowError::AuthRequired` without a session (the flow then fails).
    pub fn begin(
        &mut self,
        session: Option<&AuthSession>,
        now: DateTime<Utc>,
    ) -> Result<LessonCompletion, FlowError> {
        if self.is_submitting() {
            return Err(FlowError::InFlight);
        }
        if session.is_none() {
            self.state = LessonFlowState::Failed(FlowError::AuthRequired);
            return Err(FlowError::AuthRequired);
        }

        self.state = LessonFlowState::Submitting;
        Ok(LessonCompletion {
            course_id: self.course_id.clone(),
            section_id: self.section_id.clone(),
            lesson_id: self.lesson_id.clone(),
            time_spent_minutes: self.timer.minutes_spent(now),
        })
    }

    /// Settles the submission with the server's answer.
    ///
    /// # Errors
    ///
    /// Returns the converted `FlowError` when the call failed.
    pub fn finish(
        &mut self,
        response: Result<Enrollment, ApiError>,
    ) -> Result<Enrollment, FlowError> {
        match response {
            Ok(enrollment) => {
                info!(lesson = %self.lesson_id, section = %self.section_id, "lesson completed");
                self.state = LessonFlowState::Completed;
                Ok(enrollment)
            }
            Err(err) => {
                let err = FlowError::from(err);
                self.state = LessonFlowState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// `begin`, call the API, `finish`.
    ///
    /// # Errors
    ///
    /// See [`LessonCompletionFlow::begin`] and [`LessonCompletionFlow::finish`].
    pub async fn submit(
        &mut self,
        api: &dyn CourseApi,
        session: Option<&AuthSession>,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, FlowError> {
        let request = self.begin(session, now)?;
        let token = session.map(|s| &s.token).ok_or(FlowError::AuthRequired)?;
        let response = api.complete_lesson(token, &request).await;
        self.finish(response)
    }
}
