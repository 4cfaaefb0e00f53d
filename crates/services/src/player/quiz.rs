use chrono::{DateTime, Duration, Utc};
use tracing::info;

use course_core::model::{
    AnswerSheet, AnswerValue, CourseId, QuestionId, Quiz, QuizId, QuizOutcome, SectionId,
};

use crate::api::QuizSubmission;
use crate::error::{ApiError, FlowError};

/// Who decides whether another attempt is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetakePolicy {
    /// The client always offers a retake after a failed attempt and lets the
    /// server refuse it.
    #[default]
    ServerEnforced,
    /// The client refuses a retake once `attempt_count >= max_retakes`.
    EnforceLocally,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    Loading,
    /// No quiz id, or the fetch failed.
    Unavailable(String),
    Ready,
    Answering,
    Submitting,
    Result(QuizOutcome),
}

/// One learner's attempt(s) at a single quiz.
///
/// `Loading → Ready → Answering → Submitting → Result`. A failed result may
/// go back to `Answering` through [`QuizAttemptFlow::retake`]; a passed one
/// only continues.
#[derive(Debug, Clone)]
pub struct QuizAttemptFlow {
    course_id: CourseId,
    section_id: Option<SectionId>,
    quiz_id: Option<QuizId>,
    policy: RetakePolicy,
    quiz: Option<Quiz>,
    answers: AnswerSheet,
    started_at: Option<DateTime<Utc>>,
    state: QuizState,
}

impl QuizAttemptFlow {
    /// `section_id` is `None` for the course's final quiz.
    #[must_use]
    pub fn new(
        course_id: CourseId,
        section_id: Option<SectionId>,
        quiz_id: Option<QuizId>,
        policy: RetakePolicy,
    ) -> Self {
        Self {
            course_id,
            section_id,
            quiz_id,
            policy,
            quiz: None,
            answers: AnswerSheet::new(),
            started_at: None,
            state: QuizState::Loading,
        }
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn section_id(&self) -> Option<&SectionId> {
        self.section_id.as_ref()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&QuizOutcome> {
        match &self.state {
            QuizState::Result(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Questions still lacking an answer, in quiz order.
    #[must_use]
    pub fn missing(&self) -> Vec<QuestionId> {
        self.quiz
            .as_ref()
            .map(|quiz| self.answers.missing(quiz))
            .unwrap_or_default()
    }

    /// The quiz id to fetch.
    ///
    /// # Errors
    ///
    /// `FlowError::Unavailable` when there is no quiz id; the flow moves to
    /// `Unavailable`.
    pub fn begin_load(&mut self) -> Result<QuizId, FlowError> {
        match &self.quiz_id {
            Some(id) => {
                self.state = QuizState::Loading;
                Ok(id.clone())
            }
            None => Err(self.unavailable("This quiz")),
        }
    }

    /// # Errors
    ///
    /// The fetch error converted to `FlowError`. Anything other than a
    /// suspended or signed-out account renders as `Unavailable`.
    pub fn apply_load(&mut self, response: Result<Quiz, ApiError>) -> Result<(), FlowError> {
        match response {
            Ok(quiz) => {
                self.quiz = Some(quiz);
                self.answers.clear();
                self.state = QuizState::Ready;
                Ok(())
            }
            Err(err) => match FlowError::from(err) {
                err @ (FlowError::AccountSuspended | FlowError::AuthRequired) => {
                    self.state = QuizState::Unavailable(err.user_message());
                    Err(err)
                }
                _ => Err(self.unavailable("This quiz")),
            },
        }
    }

    /// Starts answering; opens the time-limit window.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.state == QuizState::Ready {
            self.state = QuizState::Answering;
            self.started_at = Some(now);
        }
    }

    /// Records an answer. The first answer also starts the attempt.
    ///
    /// # Errors
    ///
    /// `FlowError::Validation` for unknown questions or when the flow is not
    /// collecting answers.
    pub fn answer(
        &mut self,
        question: QuestionId,
        value: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<(), FlowError> {
        self.start(now);
        if self.state != QuizState::Answering {
            return Err(FlowError::Validation(
                "This quiz is not accepting answers right now.".into(),
            ));
        }
        let known = self
            .quiz
            .as_ref()
            .is_some_and(|quiz| quiz.questions().iter().any(|q| q.id() == &question));
        if !known {
            return Err(FlowError::Validation(format!(
                "Question {question} is not part of this quiz."
            )));
        }
        self.answers.set(question, value);
        Ok(())
    }

    /// Moves to `Submitting` and returns the body to send.
    ///
    /// # Errors
    ///
    /// `FlowError::Validation` if any question is unanswered (state stays
    /// `Answering`), `FlowError::InFlight` while submitting.
    pub fn begin_submit(&mut self) -> Result<QuizSubmission, FlowError> {
        match self.state {
            QuizState::Submitting => return Err(FlowError::InFlight),
            QuizState::Ready | QuizState::Answering => {}
            _ => {
                return Err(FlowError::Validation(
                    "This quiz cannot be submitted right now.".into(),
                ));
            }
        }
        let (Some(quiz), Some(quiz_id)) = (self.quiz.as_ref(), self.quiz_id.as_ref()) else {
            return Err(FlowError::Unavailable("This quiz".into()));
        };

        let missing = self.answers.missing(quiz);
        if !missing.is_empty() {
            if self.state == QuizState::Ready {
                self.state = QuizState::Answering;
            }
            return Err(FlowError::Validation(format!(
                "Please answer all questions before submitting ({} unanswered).",
                missing.len()
            )));
        }

        let submission = QuizSubmission {
            quiz_id: quiz_id.clone(),
            course_id: self.course_id.clone(),
            section_id: self.section_id.clone(),
            answers: self.answers.to_submission(quiz),
        };
        self.state = QuizState::Submitting;
        Ok(submission)
    }

    /// Settles a submission. On failure the answers are kept.
    ///
    /// # Errors
    ///
    /// The submission error converted to `FlowError`.
    pub fn apply_submit(
        &mut self,
        response: Result<QuizOutcome, ApiError>,
    ) -> Result<QuizOutcome, FlowError> {
        match response {
            Ok(outcome) => {
                info!(
                    quiz = ?self.quiz_id,
                    score = outcome.score,
                    max_score = outcome.max_score,
                    passed = outcome.passed,
                    "quiz graded"
                );
                self.state = QuizState::Result(outcome.clone());
                Ok(outcome)
            }
            Err(err) => {
                self.state = QuizState::Answering;
                Err(err.into())
            }
        }
    }

    /// Whether `retake` would be accepted now.
    #[must_use]
    pub fn can_retake(&self) -> bool {
        let Some(outcome) = self.outcome() else {
            return false;
        };
        if outcome.passed {
            return false;
        }
        match (self.policy, self.quiz.as_ref().and_then(Quiz::max_retakes)) {
            (RetakePolicy::EnforceLocally, Some(max)) => outcome.attempt_count < max,
            _ => true,
        }
    }

    /// Clears every answer and goes back to `Answering`.
    ///
    /// # Errors
    ///
    /// `FlowError::Validation` unless the last result was a fail (and, when
    /// enforced locally, retakes remain).
    pub fn retake(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        if !self.can_retake() {
            let message = match self.outcome() {
                Some(outcome) if !outcome.passed => "No retakes left for this quiz.",
                Some(_) => "This quiz is already passed.",
                None => "There is no attempt to retake.",
            };
            return Err(FlowError::Validation(message.into()));
        }
        self.answers.clear();
        self.started_at = Some(now);
        self.state = QuizState::Answering;
        Ok(())
    }

    /// Whether the learner may move on (passed result).
    #[must_use]
    pub fn can_continue(&self) -> bool {
        self.outcome().is_some_and(|outcome| outcome.passed)
    }

    /// When the time limit runs out. Display only; nothing is blocked.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let minutes = self.quiz.as_ref()?.time_limit_minutes()?;
        Some(self.started_at? + Duration::minutes(i64::from(minutes)))
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline()
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }

    fn unavailable(&mut self, what: &str) -> FlowError {
        let err = FlowError::Unavailable(what.to_string());
        self.state = QuizState::Unavailable(err.user_message());
        err
    }
}
